use tracing::warn;

use crate::domain::{WalletEventKind, WalletKind};
use crate::errors::WalletError;
use crate::ports::{WalletEnvironment, WalletHandle};

use super::{AccountsSource, ChainSource, VariantProfile};

pub(super) const PROFILE: VariantProfile = VariantProfile {
    reconciles: false,
    accounts: AccountsSource::RequestAccounts,
    chain: ChainSource::NetVersion,
    tracks_address: true,
    events: &[WalletEventKind::AccountsChanged, WalletEventKind::ChainChanged],
};

/// KaiWallet injects `window.kardiachain` and marks it with `isKaiWallet`.
pub(super) async fn probe(env: &dyn WalletEnvironment) -> Result<WalletHandle, WalletError> {
    let handle = env
        .injected("kardiachain")
        .filter(|h| h.flag("isKaiWallet"))
        .ok_or_else(|| WalletError::not_found(WalletKind::KardiaChain))?;
    // The wallet is usable even if the access prompt is dismissed; accounts are
    // requested again by getAccounts.
    if let Err(e) = handle.enable().await {
        warn!(error = %e, "kardiachain enable was not granted");
    }
    Ok(handle)
}
