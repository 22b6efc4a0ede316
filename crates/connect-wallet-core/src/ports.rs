use std::fmt;
use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ProviderConfig, TxReceipt, WalletEventKind};

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-3326 "unrecognized chain id" returned by `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("provider rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl PortError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.rpc_code() == Some(USER_REJECTED_REQUEST)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Wallet-side event callback. Payloads arrive as the JSON the wallet emitted.
pub type Listener = Box<dyn Fn(Value)>;

/// Shared handle to an injected wallet object or session.
pub type WalletHandle = Arc<dyn WalletProvider>;

/// Minimal EIP-1193 capability surface every wallet variant is driven through.
#[async_trait(?Send)]
pub trait WalletProvider: fmt::Debug {
    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError>;

    /// Legacy `enable()`: prompts for access and returns the authorized accounts.
    async fn enable(&self) -> Result<Vec<String>, PortError>;

    /// Marker flags such as `isMetaMask`, `isWalletLink` or `isKaiWallet`.
    fn flag(&self, name: &str) -> bool;

    fn on(&self, event: WalletEventKind, listener: Listener) -> Result<ListenerId, PortError>;

    fn remove_listener(&self, id: ListenerId) -> Result<(), PortError>;
}

/// Where connectors look for wallets: injected globals, QR sessions and SDK-built
/// providers.
pub trait WalletEnvironment {
    fn injected(&self, global: &str) -> Option<WalletHandle>;

    /// Creates (but does not enable) a QR-pairing session object.
    fn open_session(
        &self,
        config: &ProviderConfig,
        chain_id: u64,
    ) -> Result<WalletHandle, PortError>;

    /// Builds an SDK-backed provider bound to `rpc_url`.
    fn make_web3_provider(
        &self,
        app_name: &str,
        rpc_url: &str,
        chain_id: u64,
    ) -> Result<WalletHandle, PortError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub address: Address,
    pub abi: JsonAbi,
    pub method: String,
    pub args: Vec<String>,
}

/// Chain RPC client bound to the connected provider.
#[async_trait(?Send)]
pub trait RpcClientPort {
    fn from_provider(provider: WalletHandle) -> Self
    where
        Self: Sized;

    fn set_provider(&mut self, provider: WalletHandle);

    async fn get_balance(&self, address: Address) -> Result<U256, PortError>;

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, PortError>;

    async fn call_contract(&self, call: &ContractCall) -> Result<Value, PortError>;

    async fn sign_message(&self, address: Address, message: &str) -> Result<Bytes, PortError>;
}

#[async_trait(?Send)]
pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;

    async fn sleep_ms(&self, ms: u64);
}
