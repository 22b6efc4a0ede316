use tracing::debug;

use crate::domain::{ProviderConfig, WalletEventKind, WalletKind};
use crate::errors::WalletError;
use crate::ports::{WalletEnvironment, WalletHandle};

use super::{AccountsSource, ChainSource, VariantProfile};

pub(super) const PROFILE: VariantProfile = VariantProfile {
    reconciles: false,
    accounts: AccountsSource::Accounts,
    chain: ChainSource::ChainId,
    tracks_address: false,
    events: &[
        WalletEventKind::Connect,
        WalletEventKind::Disconnect,
        WalletEventKind::AccountsChanged,
        WalletEventKind::ChainChanged,
    ],
};

/// Creates the QR session and enables it. Closing the QR modal is reported as a user
/// rejection, never as "not found".
pub(super) async fn open(
    env: &dyn WalletEnvironment,
    config: &ProviderConfig,
    chain_id: u64,
) -> Result<WalletHandle, WalletError> {
    let session = env.open_session(config, chain_id).map_err(|e| {
        debug!(error = %e, "walletconnect session unavailable");
        WalletError::not_found(WalletKind::WalletConnect)
    })?;
    session.enable().await.map_err(|e| {
        debug!(error = %e, "walletconnect enable failed");
        WalletError::user_rejected_connect("User closed qr modal window.")
    })?;
    Ok(session)
}
