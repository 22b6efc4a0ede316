use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chains::ChainDescriptor;
use crate::domain::{StatusCode, WalletKind};
use crate::ports::PortError;

/// Title / subtitle / text triple suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub title: String,
    pub subtitle: String,
    pub text: String,
}

impl DisplayMessage {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            text: text.into(),
        }
    }

    fn error(subtitle: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("Error", subtitle, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorReason {
    UnsupportedProvider,
    NotFound,
    NotAuthorized,
    UserRejectedConnect,
    UserRejectedSwitch,
    UserRejectedAdd,
    ReconcileFailed,
    ChainMismatch,
    Disconnected,
    NoAddress,
    NotConnected,
    Rpc,
}

impl ErrorReason {
    pub const fn code(self) -> StatusCode {
        match self {
            Self::UnsupportedProvider | Self::NotFound => StatusCode::NotFound,
            Self::NotAuthorized => StatusCode::NotAuthorized,
            Self::UserRejectedSwitch
            | Self::UserRejectedAdd
            | Self::ReconcileFailed
            | Self::ChainMismatch
            | Self::Rpc => StatusCode::ChainMismatch,
            Self::UserRejectedConnect => StatusCode::ModalClosed,
            Self::Disconnected | Self::NotConnected => StatusCode::Disconnected,
            Self::NoAddress => StatusCode::NoAddress,
        }
    }
}

/// Every failure that crosses the public boundary. The numeric `code` is derived from
/// `reason`; `provider_type` is filled by the facade when `Settings::provider_type` is on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("[{code}] {}: {}", .message.subtitle, .message.text)]
pub struct WalletError {
    pub code: StatusCode,
    pub reason: ErrorReason,
    pub message: DisplayMessage,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
}

impl WalletError {
    pub fn new(reason: ErrorReason, message: DisplayMessage) -> Self {
        Self {
            code: reason.code(),
            reason,
            message,
            provider_type: None,
        }
    }

    pub fn unsupported_provider(name: &str) -> Self {
        Self::new(
            ErrorReason::UnsupportedProvider,
            DisplayMessage::error(
                "Provider Error",
                format!("Your provider doesn't exists: {name}"),
            ),
        )
    }

    pub fn not_found(kind: WalletKind) -> Self {
        let hint = match kind {
            WalletKind::MetaMask => ", please install it from metamask.io",
            WalletKind::WalletLink => ". Please install a wallet using an extension",
            _ => "",
        };
        Self::new(
            ErrorReason::NotFound,
            DisplayMessage::error("Error connect", format!("{kind} not found{hint}.")),
        )
    }

    pub fn not_authorized() -> Self {
        Self::new(
            ErrorReason::NotAuthorized,
            DisplayMessage::error("Authorized error", "You are not authorized."),
        )
    }

    pub fn user_rejected_connect(text: impl Into<String>) -> Self {
        Self::new(
            ErrorReason::UserRejectedConnect,
            DisplayMessage::error("User rejected the request", text),
        )
    }

    pub fn user_rejected_switch() -> Self {
        Self::new(
            ErrorReason::UserRejectedSwitch,
            DisplayMessage::error("Chain error", "user reject switch network"),
        )
    }

    pub fn user_rejected_add() -> Self {
        Self::new(
            ErrorReason::UserRejectedAdd,
            DisplayMessage::error("Chain error", "user reject add chain"),
        )
    }

    pub fn reconcile_failed(cause: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorReason::ReconcileFailed,
            DisplayMessage::error("Chain error", cause.to_string()),
        )
    }

    pub fn chain_mismatch(expected: &ChainDescriptor) -> Self {
        Self::new(
            ErrorReason::ChainMismatch,
            DisplayMessage::error(
                "Chain error",
                format!(
                    "Please choose {} network in your provider.",
                    expected.display_name
                ),
            ),
        )
    }

    pub fn disconnected() -> Self {
        Self::new(
            ErrorReason::Disconnected,
            DisplayMessage::error("Disconnect", "Wallet disconnected"),
        )
    }

    pub fn no_address() -> Self {
        Self::new(
            ErrorReason::NoAddress,
            DisplayMessage::error("Address error", "Unable to resolve any account address."),
        )
    }

    pub fn not_connected(operation: &str) -> Self {
        Self::new(
            ErrorReason::NotConnected,
            DisplayMessage::error(
                "Connection error",
                format!("{operation} requires a connected provider; call connect first."),
            ),
        )
    }

    pub fn rpc(cause: &PortError) -> Self {
        Self::new(
            ErrorReason::Rpc,
            DisplayMessage::error("Provider error", cause.to_string()),
        )
    }
}

#[derive(Debug, Error)]
pub enum TxError {
    #[error("transaction check requires a connected provider")]
    NotConnected,
    #[error("receipt query failed: {0}")]
    Rpc(#[from] PortError),
    #[error("transaction {hash} failed in block {block_number}")]
    Reverted {
        hash: alloy::primitives::B256,
        block_number: u64,
    },
    #[error("transaction check cancelled")]
    Cancelled,
    #[error("transaction not mined after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_map_to_the_numeric_taxonomy() {
        assert_eq!(WalletError::not_found(WalletKind::MetaMask).code.as_u8(), 2);
        assert_eq!(WalletError::unsupported_provider("x").code.as_u8(), 2);
        assert_eq!(WalletError::not_authorized().code.as_u8(), 3);
        assert_eq!(WalletError::user_rejected_switch().code.as_u8(), 4);
        assert_eq!(WalletError::user_rejected_add().code.as_u8(), 4);
        assert_eq!(WalletError::user_rejected_connect("closed").code.as_u8(), 5);
        assert_eq!(WalletError::disconnected().code.as_u8(), 6);
        assert_eq!(WalletError::no_address().code.as_u8(), 7);
    }

    #[test]
    fn display_includes_code_and_text() {
        let err = WalletError::reconcile_failed("provider exploded");
        assert_eq!(err.to_string(), "[4] Chain error: provider exploded");
    }
}
