use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chains::{hex_wire_id, ChainDescriptor};
use crate::errors::{DisplayMessage, ErrorReason, WalletError};
use crate::ports::WalletHandle;

/// Closed result taxonomy carried end-to-end as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    NotFound,
    NotAuthorized,
    ChainMismatch,
    ModalClosed,
    Disconnected,
    NoAddress,
}

impl StatusCode {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Success => 1,
            Self::NotFound => 2,
            Self::NotAuthorized => 3,
            Self::ChainMismatch => 4,
            Self::ModalClosed => 5,
            Self::Disconnected => 6,
            Self::NoAddress => 7,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Success,
            2 => Self::NotFound,
            3 => Self::NotAuthorized,
            4 => Self::ChainMismatch,
            5 => Self::ModalClosed,
            6 => Self::Disconnected,
            7 => Self::NoAddress,
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Self::from_u8(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status code {raw}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletKind {
    MetaMask,
    WalletConnect,
    WalletLink,
    KardiaChain,
}

impl WalletKind {
    pub const ALL: [Self; 4] = [
        Self::MetaMask,
        Self::WalletConnect,
        Self::WalletLink,
        Self::KardiaChain,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::MetaMask => "MetaMask",
            Self::WalletConnect => "WalletConnect",
            Self::WalletLink => "WalletLink",
            Self::KardiaChain => "KardiaChain",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WalletKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| WalletError::unsupported_provider(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Target network requested by the caller.
///
/// The four optional fields only matter together: they are the payload for
/// `wallet_addEthereumChain` when the wallet does not know `chain_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    #[serde(rename = "chainID")]
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_currency: Option<NativeCurrency>,
    #[serde(default, rename = "rpc", skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(
        default,
        rename = "blockExplorerUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub explorer_url: Option<String>,
}

impl NetworkRequest {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Self::default()
        }
    }

    pub fn with_add_chain_data(
        mut self,
        chain_name: impl Into<String>,
        native_currency: NativeCurrency,
        rpc_url: impl Into<String>,
        explorer_url: impl Into<String>,
    ) -> Self {
        self.chain_name = Some(chain_name.into());
        self.native_currency = Some(native_currency);
        self.rpc_url = Some(rpc_url.into());
        self.explorer_url = Some(explorer_url.into());
        self
    }

    pub fn wire_chain_id(&self) -> String {
        hex_wire_id(self.chain_id)
    }

    /// `wallet_addEthereumChain` parameter object, present only when all four optional
    /// fields were supplied.
    pub fn add_chain_params(&self) -> Option<serde_json::Value> {
        let chain_name = self.chain_name.as_ref()?;
        let native_currency = self.native_currency.as_ref()?;
        let rpc_url = self.rpc_url.as_ref()?;
        let explorer_url = self.explorer_url.as_ref()?;
        Some(serde_json::json!({
            "chainId": self.wire_chain_id(),
            "chainName": chain_name,
            "nativeCurrency": native_currency,
            "rpcUrls": [rpc_url],
            "blockExplorerUrls": [explorer_url],
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSource {
    #[default]
    Infura,
    Rpc,
}

/// Per-wallet provider options, as handed to `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infura_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rpc: BTreeMap<u64, String>,
    #[serde(default)]
    pub use_provider: ProviderSource,
}

impl ProviderConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// RPC endpoint for SDK-built providers: the explicit per-chain URL when
    /// `use_provider` is `rpc`, otherwise the Infura URL for the chain's display name.
    pub fn rpc_url_for(&self, chain: &ChainDescriptor) -> Option<String> {
        match self.use_provider {
            ProviderSource::Rpc => self.rpc.get(&chain.numeric_id).cloned(),
            ProviderSource::Infura => self
                .infura_id
                .as_ref()
                .map(|id| format!("https://{}.infura.io/v3/{id}", chain.display_name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub provider_type: bool,
}

#[derive(Clone, Serialize)]
pub struct ConnectionResult {
    pub code: StatusCode,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorReason>,
    #[serde(skip)]
    pub handle: Option<WalletHandle>,
    pub message: DisplayMessage,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
}

impl ConnectionResult {
    pub fn connected(kind: WalletKind, handle: WalletHandle) -> Self {
        Self {
            code: StatusCode::Success,
            connected: true,
            reason: None,
            handle: Some(handle),
            message: DisplayMessage::new(
                "Success",
                format!("{kind} Connect"),
                format!("{kind} found and connected."),
            ),
            provider_type: None,
        }
    }

    pub fn failed(error: WalletError) -> Self {
        Self {
            code: error.code,
            connected: false,
            reason: Some(error.reason),
            handle: None,
            message: error.message,
            provider_type: error.provider_type,
        }
    }
}

impl fmt::Debug for ConnectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionResult")
            .field("code", &self.code)
            .field("connected", &self.connected)
            .field("reason", &self.reason)
            .field("has_handle", &self.handle.is_some())
            .field("message", &self.message)
            .field("provider_type", &self.provider_type)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub address: Address,
    pub network: ChainDescriptor,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
}

impl AccountInfo {
    pub fn new(address: Address, network: ChainDescriptor) -> Self {
        Self {
            address,
            network,
            provider_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WalletEventKind {
    AccountsChanged,
    ChainChanged,
    Connect,
    Disconnect,
}

impl WalletEventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletEvent {
    pub name: WalletEventKind,
    pub address: Address,
    pub network: ChainDescriptor,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
}

impl WalletEvent {
    pub fn new(name: WalletEventKind, account: AccountInfo) -> Self {
        Self {
            name,
            address: account.address,
            network: account.network,
            provider_type: account.provider_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub status: Option<bool>,
}

impl TxReceipt {
    pub fn is_mined(&self) -> bool {
        self.block_number.is_some()
    }

    /// Pre-Byzantium receipts carry no status; those count as success once mined.
    pub fn is_failed(&self) -> bool {
        self.is_mined() && self.status == Some(false)
    }
}

/// A named contract registered on the facade for later calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractHandle {
    pub name: String,
    pub address: Address,
    pub abi: JsonAbi,
}

/// Anything that can carry the settings-driven `type` tag.
pub trait ProviderTagged {
    fn set_provider_type(&mut self, provider_type: Option<String>);
}

impl ProviderTagged for ConnectionResult {
    fn set_provider_type(&mut self, provider_type: Option<String>) {
        self.provider_type = provider_type;
    }
}

impl ProviderTagged for AccountInfo {
    fn set_provider_type(&mut self, provider_type: Option<String>) {
        self.provider_type = provider_type;
    }
}

impl ProviderTagged for WalletEvent {
    fn set_provider_type(&mut self, provider_type: Option<String>) {
        self.provider_type = provider_type;
    }
}

impl ProviderTagged for WalletError {
    fn set_provider_type(&mut self, provider_type: Option<String>) {
        self.provider_type = provider_type;
    }
}

impl<T: ProviderTagged, E: ProviderTagged> ProviderTagged for Result<T, E> {
    fn set_provider_type(&mut self, provider_type: Option<String>) {
        match self {
            Ok(v) => v.set_provider_type(provider_type),
            Err(e) => e.set_provider_type(provider_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_serialize_as_numbers() {
        let json = serde_json::to_string(&StatusCode::ModalClosed).expect("serialize");
        assert_eq!(json, "5");
        let back: StatusCode = serde_json::from_str("7").expect("deserialize");
        assert_eq!(back, StatusCode::NoAddress);
        assert!(serde_json::from_str::<StatusCode>("9").is_err());
    }

    #[test]
    fn wallet_names_are_a_closed_list() {
        assert_eq!("KardiaChain".parse::<WalletKind>().ok(), Some(WalletKind::KardiaChain));
        let err = "metamask".parse::<WalletKind>().expect_err("names are case-sensitive");
        assert_eq!(err.reason, ErrorReason::UnsupportedProvider);
        assert_eq!(err.code, StatusCode::NotFound);
    }

    #[test]
    fn add_chain_params_need_all_four_fields() {
        let partial = NetworkRequest {
            chain_name: Some("Fantom".to_owned()),
            rpc_url: Some("https://rpc.ftm.tools".to_owned()),
            ..NetworkRequest::new(250)
        };
        assert!(partial.add_chain_params().is_none());

        let full = NetworkRequest::new(250).with_add_chain_data(
            "Fantom",
            NativeCurrency {
                name: "Fantom".to_owned(),
                symbol: "FTM".to_owned(),
                decimals: 18,
            },
            "https://rpc.ftm.tools",
            "https://ftmscan.com",
        );
        let params = full.add_chain_params().expect("complete quad");
        assert_eq!(params["chainId"], "0xfa");
        assert_eq!(params["rpcUrls"][0], "https://rpc.ftm.tools");
    }

    #[test]
    fn rpc_url_follows_provider_source() {
        let chain = ChainDescriptor {
            numeric_id: 4,
            wire_id: "0x4".to_owned(),
            display_name: "rinkeby".to_owned(),
        };
        let mut config = ProviderConfig::named("WalletLink");
        config.infura_id = Some("abc".to_owned());
        assert_eq!(
            config.rpc_url_for(&chain).as_deref(),
            Some("https://rinkeby.infura.io/v3/abc")
        );

        config.use_provider = ProviderSource::Rpc;
        assert_eq!(config.rpc_url_for(&chain), None);
        config.rpc.insert(4, "http://localhost:8545".to_owned());
        assert_eq!(
            config.rpc_url_for(&chain).as_deref(),
            Some("http://localhost:8545")
        );
    }

    #[test]
    fn failed_receipt_requires_block_and_false_status() {
        let pending = TxReceipt {
            transaction_hash: B256::ZERO,
            block_number: None,
            status: Some(false),
        };
        assert!(!pending.is_failed());
        let reverted = TxReceipt {
            block_number: Some(10),
            ..pending.clone()
        };
        assert!(reverted.is_failed());
        let legacy = TxReceipt {
            block_number: Some(10),
            status: None,
            ..pending
        };
        assert!(legacy.is_mined() && !legacy.is_failed());
    }
}
