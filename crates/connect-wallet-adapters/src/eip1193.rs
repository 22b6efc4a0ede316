use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use connect_wallet_core::chains::{chain_id_from_json, hex_wire_id};
use connect_wallet_core::ports::UNRECOGNIZED_CHAIN;
use connect_wallet_core::{Listener, ListenerId, PortError, WalletEventKind, WalletProvider};

use crate::ConnectAdapterConfig;

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

/// An EIP-1193 wallet object. In the browser it wraps the injected JS object; on native
/// hosts it forwards to a JSON-RPC wallet proxy or runs a deterministic in-memory wallet.
#[derive(Clone)]
pub struct InjectedProvider {
    mode: ProviderMode,
    state: Arc<Mutex<WalletState>>,
    listeners: Arc<Mutex<ListenerTable>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser(wasm_bindgen::JsValue),
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
    next_id: Arc<std::sync::atomic::AtomicU64>,
}

#[derive(Debug, Clone)]
struct WalletState {
    accounts: Vec<Address>,
    chain_id: u64,
    known_chains: BTreeSet<u64>,
    flags: BTreeSet<String>,
    /// Sticky failures keyed by method name; `enable` covers the legacy call.
    rejections: HashMap<String, PortError>,
    /// Scripted receipt responses. The last entry repeats once the queue is drained.
    receipts: HashMap<B256, VecDeque<Value>>,
    balances: HashMap<Address, U256>,
    call_results: HashMap<Address, Bytes>,
    requests: Vec<String>,
    /// Last accounts/chain seen through the proxy, to turn changes into events.
    observed_accounts: Option<Vec<Address>>,
    observed_chain: Option<u64>,
}

impl Default for WalletState {
    fn default() -> Self {
        Self {
            accounts: vec![address!("1000000000000000000000000000000000000001")],
            chain_id: 1,
            known_chains: BTreeSet::from([1, 5, 56, 137, 11_155_111]),
            flags: BTreeSet::new(),
            rejections: HashMap::new(),
            receipts: HashMap::new(),
            balances: HashMap::new(),
            call_results: HashMap::new(),
            requests: Vec::new(),
            observed_accounts: None,
            observed_chain: None,
        }
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(ListenerId, WalletEventKind, Rc<dyn Fn(Value)>)>,
    #[cfg(target_arch = "wasm32")]
    hooks: HashMap<
        ListenerId,
        (
            WalletEventKind,
            wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>,
        ),
    >,
}

impl ListenerTable {
    fn allocate(&mut self) -> ListenerId {
        self.next_id = self.next_id.saturating_add(1);
        ListenerId(self.next_id)
    }

    fn len(&self) -> usize {
        #[cfg(target_arch = "wasm32")]
        return self.entries.len() + self.hooks.len();
        #[cfg(not(target_arch = "wasm32"))]
        self.entries.len()
    }
}

impl fmt::Debug for InjectedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedProvider")
            .field("mode", &self.mode_name())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for InjectedProvider {
    fn default() -> Self {
        Self::with_config(&ConnectAdapterConfig::from_env())
    }
}

impl InjectedProvider {
    pub fn with_config(config: &ConnectAdapterConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = match browser::window_global("ethereum") {
            Some(object) => ProviderMode::Browser(object),
            None if config.strict_runtime_required() => ProviderMode::Disabled(
                "window.ethereum not found in production runtime profile".to_owned(),
            ),
            None => ProviderMode::Deterministic,
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = match config.wallet_proxy_url.as_deref() {
            Some(base_url) => match ProxyRuntime::new(base_url, config.wallet_proxy_timeout_ms) {
                Ok(proxy) => ProviderMode::Proxy(proxy),
                Err(e) if config.strict_runtime_required() => ProviderMode::Disabled(format!(
                    "failed to initialize wallet proxy client in production profile: {e}"
                )),
                Err(_) => ProviderMode::Deterministic,
            },
            None if config.strict_runtime_required() => ProviderMode::Disabled(
                "wallet proxy URL not configured in production runtime profile".to_owned(),
            ),
            None => ProviderMode::Deterministic,
        };

        let provider = Self::from_mode(mode);
        #[cfg(not(target_arch = "wasm32"))]
        if matches!(provider.mode, ProviderMode::Proxy(_)) {
            let mut state = provider.state();
            state.flags = config.wallet_proxy_flags.iter().cloned().collect();
            // Proxied wallets report their own state; nothing is assumed up front.
            state.accounts.clear();
        }
        provider
    }

    /// In-memory wallet with one account on mainnet.
    pub fn deterministic() -> Self {
        Self::from_mode(ProviderMode::Deterministic)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::from_mode(ProviderMode::Disabled(reason.into()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn proxy(
        base_url: impl Into<String>,
        timeout_ms: u64,
        flags: &[&str],
    ) -> Result<Self, PortError> {
        let proxy = ProxyRuntime::new(&base_url.into(), timeout_ms)?;
        let provider = Self::from_mode(ProviderMode::Proxy(proxy));
        {
            let mut state = provider.state();
            state.flags = flags.iter().map(|f| (*f).to_owned()).collect();
            state.accounts.clear();
        }
        Ok(provider)
    }

    /// Wraps an injected JS wallet object such as `window.ethereum`.
    #[cfg(target_arch = "wasm32")]
    pub fn browser(object: wasm_bindgen::JsValue) -> Self {
        Self::from_mode(ProviderMode::Browser(object))
    }

    fn from_mode(mode: ProviderMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(WalletState::default())),
            listeners: Arc::new(Mutex::new(ListenerTable::default())),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match &self.mode {
            ProviderMode::Disabled(_) => "disabled",
            ProviderMode::Deterministic => "deterministic",
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => "proxy",
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser(_) => "browser",
        }
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener_table(&self) -> MutexGuard<'_, ListenerTable> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.state().accounts = accounts;
        self
    }

    pub fn with_chain(self, chain_id: u64) -> Self {
        {
            let mut state = self.state();
            state.chain_id = chain_id;
            state.known_chains.insert(chain_id);
        }
        self
    }

    /// Replaces the set of chains `wallet_switchEthereumChain` accepts.
    pub fn with_known_chains(self, chains: impl IntoIterator<Item = u64>) -> Self {
        {
            let mut state = self.state();
            state.known_chains = chains.into_iter().collect();
            let current = state.chain_id;
            state.known_chains.insert(current);
        }
        self
    }

    pub fn with_flag(self, flag: &str) -> Self {
        self.state().flags.insert(flag.to_owned());
        self
    }

    /// Makes every later call of `method` fail with `error`. Use `"enable"` for the legacy
    /// `enable()` call.
    pub fn reject(&self, method: &str, error: PortError) {
        self.state().rejections.insert(method.to_owned(), error);
    }

    pub fn allow(&self, method: &str) {
        self.state().rejections.remove(method);
    }

    /// Queues the next `eth_getTransactionReceipt` answer for `hash`; `Value::Null` means
    /// not mined yet.
    pub fn push_receipt(&self, hash: B256, receipt: Value) {
        self.state()
            .receipts
            .entry(hash)
            .or_default()
            .push_back(receipt);
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state().balances.insert(address, balance);
    }

    /// Return data of `eth_call` against `to`.
    pub fn set_call_result(&self, to: Address, data: Bytes) {
        self.state().call_results.insert(to, data);
    }

    /// Methods received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.state().chain_id
    }

    pub fn listener_count(&self) -> usize {
        self.listener_table().len()
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.check_mode()?;
        let payload = accounts_json(&accounts);
        self.state().accounts = accounts;
        self.emit(WalletEventKind::AccountsChanged, payload);
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        self.check_mode()?;
        {
            let mut state = self.state();
            state.chain_id = chain_id;
            state.known_chains.insert(chain_id);
        }
        self.emit(WalletEventKind::ChainChanged, json!(hex_wire_id(chain_id)));
        Ok(())
    }

    /// Fires `kind` with a raw payload, e.g. a WalletConnect `connect` or `disconnect`.
    pub fn debug_emit(&self, kind: WalletEventKind, payload: Value) -> Result<(), PortError> {
        self.check_mode()?;
        self.emit(kind, payload);
        Ok(())
    }

    /// Re-reads accounts and chain from the proxied wallet, raising change events. Other
    /// modes push their events directly.
    pub async fn poll_events(&self) -> Result<(), PortError> {
        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ProviderMode::Proxy(_)) {
            self.request("eth_accounts", json!([])).await?;
            self.request("eth_chainId", json!([])).await?;
        }
        self.check_mode()
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    /// Listeners run outside the table lock, in registration order.
    fn emit(&self, kind: WalletEventKind, payload: Value) {
        let targets: Vec<Rc<dyn Fn(Value)>> = self
            .listener_table()
            .entries
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, listener)| Rc::clone(listener))
            .collect();
        debug!(event = kind.as_str(), listeners = targets.len(), "wallet event");
        for listener in targets {
            listener(payload.clone());
        }
    }

    fn deterministic_request(&self, method: &str, params: &Value) -> Result<Value, PortError> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.state();
            state.requests.push(method.to_owned());
            match state.rejections.get(method) {
                Some(err) => Err(err.clone()),
                None => answer(&mut state, method, params, &mut events),
            }
        };
        for (kind, payload) in events {
            self.emit(kind, payload);
        }
        result
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn observe(&self, method: &str, result: &Value) {
        let mut events = Vec::new();
        {
            let mut state = self.state();
            match method {
                "eth_accounts" | "eth_requestAccounts" => {
                    let Ok(accounts) = parse_addresses(result) else {
                        return;
                    };
                    if state
                        .observed_accounts
                        .as_ref()
                        .is_some_and(|prev| *prev != accounts)
                    {
                        events.push((WalletEventKind::AccountsChanged, result.clone()));
                    }
                    state.accounts = accounts.clone();
                    state.observed_accounts = Some(accounts);
                }
                "eth_chainId" => {
                    let Ok(chain_id) = chain_id_from_json(result) else {
                        return;
                    };
                    if state.observed_chain.is_some_and(|prev| prev != chain_id) {
                        events.push((WalletEventKind::ChainChanged, json!(hex_wire_id(chain_id))));
                    }
                    state.chain_id = chain_id;
                    state.observed_chain = Some(chain_id);
                }
                _ => {}
            }
        }
        for (kind, payload) in events {
            self.emit(kind, payload);
        }
    }
}

fn answer(
    state: &mut WalletState,
    method: &str,
    params: &Value,
    events: &mut Vec<(WalletEventKind, Value)>,
) -> Result<Value, PortError> {
    match method {
        "eth_requestAccounts" | "eth_accounts" => Ok(accounts_json(&state.accounts)),
        "eth_chainId" => Ok(json!(hex_wire_id(state.chain_id))),
        "net_version" => Ok(json!(state.chain_id.to_string())),
        "wallet_switchEthereumChain" => {
            let target = param_chain_id(params)?;
            if !state.known_chains.contains(&target) {
                return Err(PortError::rpc(
                    UNRECOGNIZED_CHAIN,
                    format!("Unrecognized chain ID \"{}\".", hex_wire_id(target)),
                ));
            }
            switch_chain(state, target, events);
            Ok(Value::Null)
        }
        "wallet_addEthereumChain" => {
            let target = param_chain_id(params)?;
            state.known_chains.insert(target);
            switch_chain(state, target, events);
            Ok(Value::Null)
        }
        "eth_getBalance" => {
            let owner: Address = param_str(params, 0)?
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid address: {e}")))?;
            let balance = state.balances.get(&owner).copied().unwrap_or_default();
            Ok(json!(format!("0x{balance:x}")))
        }
        "eth_getTransactionReceipt" => {
            let hash: B256 = param_str(params, 0)?
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid tx hash: {e}")))?;
            let next = match state.receipts.get_mut(&hash) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            Ok(next.unwrap_or(Value::Null))
        }
        "eth_call" => {
            let to: Address = params
                .get(0)
                .and_then(|call| call.get("to"))
                .and_then(Value::as_str)
                .ok_or_else(|| PortError::Validation("eth_call requires a 'to' field".to_owned()))?
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid call target: {e}")))?;
            let data = state.call_results.get(&to).cloned().unwrap_or_default();
            Ok(json!(data.to_string()))
        }
        "personal_sign" => {
            let message = Bytes::from_str(param_str(params, 0)?)
                .map_err(|e| PortError::Validation(format!("invalid message hex: {e}")))?;
            let signer: Address = param_str(params, 1)?
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid signer: {e}")))?;
            Ok(json!(deterministic_signature(signer, &message).to_string()))
        }
        other => Err(PortError::rpc(
            METHOD_NOT_FOUND,
            format!("method {other} not supported by the deterministic wallet"),
        )),
    }
}

fn switch_chain(state: &mut WalletState, target: u64, events: &mut Vec<(WalletEventKind, Value)>) {
    if state.chain_id != target {
        state.chain_id = target;
        events.push((WalletEventKind::ChainChanged, json!(hex_wire_id(target))));
    }
}

fn deterministic_signature(signer: Address, message: &[u8]) -> Bytes {
    let mut seed = Vec::with_capacity(20 + message.len());
    seed.extend_from_slice(signer.as_slice());
    seed.extend_from_slice(message);
    let hash = keccak256(seed);
    let mut sig = Vec::with_capacity(65);
    sig.extend_from_slice(hash.as_slice());
    sig.extend_from_slice(hash.as_slice());
    sig.push(27);
    Bytes::from(sig)
}

fn accounts_json(accounts: &[Address]) -> Value {
    Value::from(accounts.iter().map(|a| a.to_string()).collect::<Vec<_>>())
}

fn param_str(params: &Value, index: usize) -> Result<&str, PortError> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| PortError::Validation(format!("missing string parameter #{index}")))
}

fn param_chain_id(params: &Value) -> Result<u64, PortError> {
    let raw = params
        .get(0)
        .and_then(|p| p.get("chainId"))
        .ok_or_else(|| PortError::Validation("missing chainId parameter".to_owned()))?;
    chain_id_from_json(raw)
}

fn parse_addresses(raw: &Value) -> Result<Vec<Address>, PortError> {
    string_list(raw)?
        .iter()
        .map(|s| {
            s.parse()
                .map_err(|e| PortError::Validation(format!("invalid account '{s}': {e}")))
        })
        .collect()
}

fn string_list(raw: &Value) -> Result<Vec<String>, PortError> {
    raw.as_array()
        .ok_or_else(|| PortError::Validation("accounts result must be an array".to_owned()))?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or_else(|| PortError::Validation("account must be a string".to_owned()))
        })
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
impl ProxyRuntime {
    fn new(base_url: &str, timeout_ms: u64) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(format!("wallet proxy client init failed: {e}")))?;
        Ok(Self {
            base_url: base_url.to_owned(),
            client,
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("wallet proxy request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("wallet proxy json decode failed: {e}")))?;
        // Wallet errors keep their EIP-1193 code so rejections and unknown chains are
        // distinguishable upstream.
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(-32603);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("wallet proxy returned an error");
            return Err(PortError::rpc(code, message));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "wallet proxy status {status}: {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport("wallet proxy response missing result".to_owned()))
    }
}

#[async_trait(?Send)]
impl WalletProvider for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ProviderMode::Deterministic => self.deterministic_request(method, &params),
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => {
                self.state().requests.push(method.to_owned());
                let result = proxy.call(method, params).await?;
                self.observe(method, &result);
                Ok(result)
            }
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser(object) => browser::request(object, method, params).await,
        }
    }

    async fn enable(&self) -> Result<Vec<String>, PortError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ProviderMode::Deterministic => {
                let mut state = self.state();
                state.requests.push("enable".to_owned());
                if let Some(err) = state.rejections.get("enable") {
                    return Err(err.clone());
                }
                Ok(state.accounts.iter().map(|a| a.to_string()).collect())
            }
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => {
                let raw = self.request("eth_requestAccounts", json!([])).await?;
                string_list(&raw)
            }
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser(object) => {
                let raw = browser::enable(object).await?;
                string_list(&raw)
            }
        }
    }

    fn flag(&self, name: &str) -> bool {
        #[cfg(target_arch = "wasm32")]
        if let ProviderMode::Browser(object) = &self.mode {
            return browser::flag(object, name);
        }
        self.state().flags.contains(name)
    }

    fn on(&self, event: WalletEventKind, listener: Listener) -> Result<ListenerId, PortError> {
        self.check_mode()?;
        let mut table = self.listener_table();
        let id = table.allocate();

        #[cfg(target_arch = "wasm32")]
        if let ProviderMode::Browser(object) = &self.mode {
            let hook = browser::on(object, event, listener)?;
            table.hooks.insert(id, (event, hook));
            return Ok(id);
        }

        table.entries.push((id, event, Rc::from(listener)));
        Ok(id)
    }

    fn remove_listener(&self, id: ListenerId) -> Result<(), PortError> {
        let mut table = self.listener_table();

        #[cfg(target_arch = "wasm32")]
        if let ProviderMode::Browser(object) = &self.mode {
            let (event, hook) = table
                .hooks
                .remove(&id)
                .ok_or_else(|| PortError::NotFound(format!("listener {}", id.0)))?;
            return browser::remove_listener(object, event, &hook);
        }

        let before = table.entries.len();
        table.entries.retain(|(entry, _, _)| *entry != id);
        if table.entries.len() == before {
            return Err(PortError::NotFound(format!("listener {}", id.0)));
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub(crate) mod browser {
    use serde::Serialize;
    use serde_json::Value;
    use wasm_bindgen::{closure::Closure, JsCast, JsValue};

    use connect_wallet_core::{Listener, PortError, WalletEventKind};

    pub(crate) fn window_global(name: &str) -> Option<JsValue> {
        let window = web_sys::window()?;
        get_prop(&window.into(), name)
            .ok()
            .filter(|v| !v.is_null() && !v.is_undefined())
    }

    pub(crate) fn get_prop(target: &JsValue, key: &str) -> Result<JsValue, PortError> {
        js_sys::Reflect::get(target, &JsValue::from_str(key))
            .map_err(|e| PortError::Transport(format!("read wallet property {key} failed: {e:?}")))
    }

    fn function(target: &JsValue, key: &str) -> Option<js_sys::Function> {
        get_prop(target, key)
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
    }

    pub(crate) fn to_js(value: &Value) -> Result<JsValue, PortError> {
        value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| PortError::Transport(format!("failed to encode wallet request: {e}")))
    }

    /// Rejections from wallets are `{ code, message }` objects; keep the code.
    fn rejection(error: JsValue) -> PortError {
        let code = get_prop(&error, "code").ok().and_then(|c| c.as_f64());
        let message = get_prop(&error, "message")
            .ok()
            .and_then(|m| m.as_string())
            .unwrap_or_else(|| format!("{error:?}"));
        match code {
            Some(code) => PortError::rpc(code as i64, message),
            None => PortError::Transport(message),
        }
    }

    pub(crate) async fn await_promise(value: JsValue) -> Result<Value, PortError> {
        let promise = value.dyn_into::<js_sys::Promise>().map_err(|_| {
            PortError::Transport("wallet call did not return a Promise".to_owned())
        })?;
        let result = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(rejection)?;
        if result.is_undefined() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result)
            .map_err(|e| PortError::Transport(format!("failed to decode wallet response: {e}")))
    }

    pub(crate) async fn request(
        object: &JsValue,
        method: &str,
        params: Value,
    ) -> Result<Value, PortError> {
        let request_fn = function(object, "request")
            .ok_or(PortError::NotImplemented("wallet.request is unavailable"))?;
        let args = to_js(&serde_json::json!({ "method": method, "params": params }))?;
        let promise = request_fn.call1(object, &args).map_err(rejection)?;
        await_promise(promise).await
    }

    pub(crate) async fn enable(object: &JsValue) -> Result<Value, PortError> {
        match function(object, "enable") {
            Some(enable) => await_promise(enable.call0(object).map_err(rejection)?).await,
            None => request(object, "eth_requestAccounts", serde_json::json!([])).await,
        }
    }

    pub(crate) fn flag(object: &JsValue, name: &str) -> bool {
        get_prop(object, name)
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub(crate) fn on(
        object: &JsValue,
        event: WalletEventKind,
        listener: Listener,
    ) -> Result<Closure<dyn FnMut(JsValue)>, PortError> {
        let on_fn = function(object, "on")
            .or_else(|| function(object, "addListener"))
            .ok_or(PortError::NotImplemented("wallet does not expose on/addListener"))?;
        let hook = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let payload = serde_wasm_bindgen::from_value::<Value>(value).unwrap_or(Value::Null);
            listener(payload);
        });
        on_fn
            .call2(
                object,
                &JsValue::from_str(event.as_str()),
                hook.as_ref().unchecked_ref(),
            )
            .map_err(rejection)?;
        Ok(hook)
    }

    pub(crate) fn remove_listener(
        object: &JsValue,
        event: WalletEventKind,
        hook: &Closure<dyn FnMut(JsValue)>,
    ) -> Result<(), PortError> {
        let Some(remove_fn) = function(object, "removeListener") else {
            return Err(PortError::NotImplemented(
                "wallet does not expose removeListener",
            ));
        };
        remove_fn
            .call2(
                object,
                &JsValue::from_str(event.as_str()),
                hook.as_ref().unchecked_ref(),
            )
            .map(|_| ())
            .map_err(rejection)
    }
}
