use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use connect_wallet_core::{PortError, ProviderConfig, WalletEnvironment, WalletHandle};

type SessionFactory = Box<dyn Fn(&ProviderConfig, u64) -> Result<WalletHandle, PortError>>;
type SdkFactory = Box<dyn Fn(&str, &str, u64) -> Result<WalletHandle, PortError>>;

/// Wallet globals and factories fixed up front. Native hosts and tests use this where a
/// browser would expose `window.*`.
#[derive(Default)]
pub struct StaticEnvironment {
    globals: HashMap<String, WalletHandle>,
    session_factory: Option<SessionFactory>,
    sdk_factory: Option<SdkFactory>,
}

impl fmt::Debug for StaticEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut globals: Vec<&String> = self.globals.keys().collect();
        globals.sort();
        f.debug_struct("StaticEnvironment")
            .field("globals", &globals)
            .field("session_factory", &self.session_factory.is_some())
            .field("sdk_factory", &self.sdk_factory.is_some())
            .finish()
    }
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, name: impl Into<String>, handle: WalletHandle) -> Self {
        self.globals.insert(name.into(), handle);
        self
    }

    pub fn with_session_factory(
        mut self,
        factory: impl Fn(&ProviderConfig, u64) -> Result<WalletHandle, PortError> + 'static,
    ) -> Self {
        self.session_factory = Some(Box::new(factory));
        self
    }

    pub fn with_sdk_factory(
        mut self,
        factory: impl Fn(&str, &str, u64) -> Result<WalletHandle, PortError> + 'static,
    ) -> Self {
        self.sdk_factory = Some(Box::new(factory));
        self
    }
}

impl WalletEnvironment for StaticEnvironment {
    fn injected(&self, global: &str) -> Option<WalletHandle> {
        self.globals.get(global).cloned()
    }

    fn open_session(
        &self,
        config: &ProviderConfig,
        chain_id: u64,
    ) -> Result<WalletHandle, PortError> {
        let factory = self
            .session_factory
            .as_ref()
            .ok_or(PortError::NotImplemented("no walletconnect session factory configured"))?;
        debug!(chain_id, bridge = ?config.bridge, "opening walletconnect session");
        factory(config, chain_id)
    }

    fn make_web3_provider(
        &self,
        app_name: &str,
        rpc_url: &str,
        chain_id: u64,
    ) -> Result<WalletHandle, PortError> {
        let factory = self
            .sdk_factory
            .as_ref()
            .ok_or(PortError::NotImplemented("no walletlink sdk factory configured"))?;
        debug!(app_name, rpc_url, chain_id, "building walletlink provider");
        factory(app_name, rpc_url, chain_id)
    }
}

/// `window.*` lookups plus the WalletConnect and WalletLink SDK constructors loaded as
/// page scripts.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct BrowserEnvironment;

#[cfg(target_arch = "wasm32")]
impl BrowserEnvironment {
    fn construct(
        global: &str,
        options: &serde_json::Value,
    ) -> Result<wasm_bindgen::JsValue, PortError> {
        use wasm_bindgen::JsCast;

        use crate::eip1193::browser;

        let module = browser::window_global(global)
            .ok_or_else(|| PortError::NotFound(format!("window.{global} missing")))?;
        // UMD bundles expose the class either directly or as `.default`.
        let ctor = browser::get_prop(&module, "default")
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
            .or_else(|| module.dyn_into::<js_sys::Function>().ok())
            .ok_or_else(|| PortError::NotFound(format!("window.{global} is not a constructor")))?;
        let args = js_sys::Array::of1(&browser::to_js(options)?);
        js_sys::Reflect::construct(&ctor, &args)
            .map_err(|e| PortError::Transport(format!("constructing {global} failed: {e:?}")))
    }
}

#[cfg(target_arch = "wasm32")]
impl WalletEnvironment for BrowserEnvironment {
    fn injected(&self, global: &str) -> Option<WalletHandle> {
        crate::eip1193::browser::window_global(global)
            .map(|object| {
                std::sync::Arc::new(crate::InjectedProvider::browser(object)) as WalletHandle
            })
    }

    fn open_session(
        &self,
        config: &ProviderConfig,
        chain_id: u64,
    ) -> Result<WalletHandle, PortError> {
        let mut options = serde_json::json!({ "chainId": chain_id, "rpc": config.rpc });
        if let Some(bridge) = &config.bridge {
            options["bridge"] = serde_json::json!(bridge);
        }
        if let Some(infura_id) = &config.infura_id {
            options["infuraId"] = serde_json::json!(infura_id);
        }
        let session = Self::construct("WalletConnectProvider", &options)?;
        Ok(std::sync::Arc::new(crate::InjectedProvider::browser(session)))
    }

    fn make_web3_provider(
        &self,
        app_name: &str,
        rpc_url: &str,
        chain_id: u64,
    ) -> Result<WalletHandle, PortError> {
        use wasm_bindgen::{JsCast, JsValue};

        let sdk = Self::construct("WalletLink", &serde_json::json!({ "appName": app_name }))?;
        let make = crate::eip1193::browser::get_prop(&sdk, "makeWeb3Provider")?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| PortError::NotImplemented("WalletLink.makeWeb3Provider is unavailable"))?;
        let provider = make
            .call2(&sdk, &JsValue::from_str(rpc_url), &JsValue::from_f64(chain_id as f64))
            .map_err(|e| PortError::Transport(format!("makeWeb3Provider failed: {e:?}")))?;
        Ok(std::sync::Arc::new(crate::InjectedProvider::browser(provider)))
    }
}
