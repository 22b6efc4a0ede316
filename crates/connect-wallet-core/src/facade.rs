//! Single public entry point: wallet selection, settings tagging, RPC wiring and
//! transaction tracking.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chains::{self, ChainDescriptor, ChainEntry};
use crate::connector::Connector;
use crate::domain::{
    AccountInfo, ConnectionResult, ContractHandle, NetworkRequest, ProviderConfig,
    ProviderTagged, Settings, TxReceipt, WalletKind,
};
use crate::errors::{TxError, WalletError};
use crate::events::{EventStream, WeakSubscription};
use crate::ports::{ClockPort, ContractCall, PortError, RpcClientPort, WalletEnvironment};
use crate::tx::{self, PollPolicy, TxBroadcast, TxSubscription};

pub struct ConnectWallet<E, R, C> {
    env: E,
    clock: C,
    app_name: String,
    connector: Option<Connector>,
    settings: Settings,
    rpc: Option<R>,
    contracts: HashMap<String, ContractHandle>,
    tx_broadcast: TxBroadcast,
    poll_policy: PollPolicy,
    subscriptions: Vec<WeakSubscription>,
}

impl<E, R, C> ConnectWallet<E, R, C>
where
    E: WalletEnvironment,
    R: RpcClientPort,
    C: ClockPort,
{
    pub fn new(env: E, clock: C, app_name: impl Into<String>) -> Self {
        Self {
            env,
            clock,
            app_name: app_name.into(),
            connector: None,
            settings: Settings::default(),
            rpc: None,
            contracts: HashMap::new(),
            tx_broadcast: TxBroadcast::default(),
            poll_policy: PollPolicy::default(),
            subscriptions: Vec::new(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn rpc(&self) -> Option<&R> {
        self.rpc.as_ref()
    }

    /// Connects to the wallet named by `config.name`. Unsupported names fail with code 2
    /// before any connector exists; otherwise the previous connector is released first.
    pub async fn connect(
        &mut self,
        config: &ProviderConfig,
        network: NetworkRequest,
        settings: Option<Settings>,
    ) -> ConnectionResult {
        let settings = settings.unwrap_or_default();
        let kind = match config.name.parse::<WalletKind>() {
            Ok(kind) => kind,
            Err(err) => {
                info!(provider = %config.name, "unsupported wallet provider");
                let mut result = ConnectionResult::failed(err);
                result.set_provider_type(settings.provider_type.then(|| config.name.clone()));
                return result;
            }
        };
        self.settings = settings;

        self.release_connector();
        let mut connector = Connector::new(kind, network);
        let outcome = connector.connect(&self.env, config, &self.app_name).await;
        self.connector = Some(connector);

        let result = match outcome {
            Ok(result) => {
                if let Some(handle) = result.handle.clone() {
                    match self.rpc.as_mut() {
                        Some(rpc) => rpc.set_provider(handle),
                        None => self.rpc = Some(R::from_provider(handle)),
                    }
                }
                result
            }
            Err(err) => ConnectionResult::failed(err),
        };
        self.apply_settings(result)
    }

    /// One-shot account lookup. On top of the connector's own reconciliation, the
    /// reported chain must equal the requested one.
    pub async fn get_accounts(&self) -> Result<AccountInfo, WalletError> {
        let result = match self.active("getAccounts") {
            Ok(connector) => Self::accounts_on_requested_chain(connector).await,
            Err(err) => Err(err),
        };
        self.apply_settings(result)
    }

    async fn accounts_on_requested_chain(
        connector: &Connector,
    ) -> Result<AccountInfo, WalletError> {
        let info = connector.get_accounts().await?;
        let requested = connector.network().chain_id;
        if info.network.numeric_id != requested {
            debug!(
                reported = info.network.numeric_id,
                requested, "account lookup on the wrong chain"
            );
            return Err(WalletError::chain_mismatch(&chains::describe_chain(requested)));
        }
        Ok(info)
    }

    /// Continuous event stream of the active wallet. Fails immediately without one.
    pub fn event_subscriber(&mut self) -> Result<EventStream, WalletError> {
        let stream = self
            .active("eventSubscriber")
            .and_then(Connector::event_subscriber)
            .map_err(|e| self.apply_settings(e))?
            .with_provider_type(self.provider_type());
        self.subscriptions.retain(WeakSubscription::is_live);
        self.subscriptions.push(stream.subscription().downgrade());
        Ok(stream)
    }

    pub fn add_chains(
        &self,
        entries: impl IntoIterator<Item = ChainEntry>,
    ) -> Vec<ChainDescriptor> {
        chains::register_chains(entries)
    }

    pub fn tx_subscribe(&self) -> TxSubscription {
        self.tx_broadcast.subscribe()
    }

    pub async fn tx_check(&self, hash: B256) -> Result<TxReceipt, TxError> {
        self.tx_check_with(hash, &CancellationToken::new()).await
    }

    /// Polls until `hash` is mined, fails or `cancel` fires.
    pub async fn tx_check_with(
        &self,
        hash: B256,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, TxError> {
        let rpc = self.rpc.as_ref().ok_or(TxError::NotConnected)?;
        tx::watch_transaction(
            rpc,
            &self.clock,
            &self.tx_broadcast,
            self.poll_policy,
            hash,
            cancel,
        )
        .await
    }

    pub fn connector(&self) -> Option<&Connector> {
        self.connector.as_ref()
    }

    pub fn provider_name(&self) -> Option<&'static str> {
        self.connector.as_ref().map(|c| c.kind().name())
    }

    /// Drops the active connector and removes every wallet listener registered through
    /// streams this facade handed out.
    pub fn reset_connect(&mut self) {
        if let Some(kind) = self.provider_name() {
            info!(wallet = kind, "resetting wallet connection");
        }
        self.release_connector();
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256, WalletError> {
        let rpc = self
            .rpc_client("getBalance")
            .map_err(|e| self.apply_settings(e))?;
        rpc.get_balance(address)
            .await
            .map_err(|e| self.apply_settings(WalletError::rpc(&e)))
    }

    pub async fn sign_message(
        &self,
        address: Address,
        message: &str,
    ) -> Result<Bytes, WalletError> {
        let rpc = self
            .rpc_client("signMessage")
            .map_err(|e| self.apply_settings(e))?;
        rpc.sign_message(address, message)
            .await
            .map_err(|e| self.apply_settings(WalletError::rpc(&e)))
    }

    /// Registers (or replaces) a named contract.
    pub fn add_contract(
        &mut self,
        name: impl Into<String>,
        address: Address,
        abi: JsonAbi,
    ) -> &ContractHandle {
        let name = name.into();
        debug!(contract = %name, %address, "contract registered");
        let handle = ContractHandle {
            name: name.clone(),
            address,
            abi,
        };
        match self.contracts.entry(name) {
            Entry::Occupied(mut slot) => {
                slot.insert(handle);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(handle),
        }
    }

    pub fn contract(&self, name: &str) -> Option<&ContractHandle> {
        self.contracts.get(name)
    }

    pub async fn call_contract(
        &self,
        name: &str,
        method: &str,
        args: Vec<String>,
    ) -> Result<Value, WalletError> {
        self.call_contract_inner(name, method, args)
            .await
            .map_err(|e| self.apply_settings(e))
    }

    async fn call_contract_inner(
        &self,
        name: &str,
        method: &str,
        args: Vec<String>,
    ) -> Result<Value, WalletError> {
        let rpc = self.rpc_client("callContract")?;
        let contract = self.contracts.get(name).ok_or_else(|| {
            WalletError::rpc(&PortError::NotFound(format!("contract '{name}' is not registered")))
        })?;
        let call = ContractCall {
            address: contract.address,
            abi: contract.abi.clone(),
            method: method.to_owned(),
            args,
        };
        rpc.call_contract(&call).await.map_err(|e| WalletError::rpc(&e))
    }

    fn release_connector(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
        if let Some(mut connector) = self.connector.take() {
            connector.reset();
        }
    }

    fn active(&self, operation: &str) -> Result<&Connector, WalletError> {
        self.connector
            .as_ref()
            .ok_or_else(|| WalletError::not_connected(operation))
    }

    fn rpc_client(&self, operation: &str) -> Result<&R, WalletError> {
        self.rpc
            .as_ref()
            .ok_or_else(|| WalletError::not_connected(operation))
    }

    fn provider_type(&self) -> Option<String> {
        if !self.settings.provider_type {
            return None;
        }
        self.provider_name().map(str::to_owned)
    }

    fn apply_settings<T: ProviderTagged>(&self, mut value: T) -> T {
        value.set_provider_type(self.provider_type());
        value
    }
}
