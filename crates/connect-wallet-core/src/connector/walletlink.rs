use crate::chains;
use crate::domain::{ProviderConfig, WalletEventKind, WalletKind};
use crate::errors::WalletError;
use crate::ports::{WalletEnvironment, WalletHandle};

use super::{AccountsSource, ChainSource, VariantProfile};

pub(super) const PROFILE: VariantProfile = VariantProfile {
    reconciles: true,
    accounts: AccountsSource::Enable,
    chain: ChainSource::ChainId,
    tracks_address: true,
    events: &[WalletEventKind::AccountsChanged, WalletEventKind::ChainChanged],
};

/// Coinbase Wallet: an `ethereum` object flagged `isWalletLink` is used directly. With
/// only the Coinbase extension installed, an SDK provider is built on the configured RPC
/// endpoint for the requested chain.
pub(super) fn probe(
    env: &dyn WalletEnvironment,
    config: &ProviderConfig,
    app_name: &str,
    chain_id: u64,
) -> Result<WalletHandle, WalletError> {
    if let Some(ethereum) = env.injected("ethereum").filter(|h| h.flag("isWalletLink")) {
        return Ok(ethereum);
    }

    let has_extension = env
        .injected("coinbaseWalletExtension")
        .is_some_and(|h| h.flag("isCoinbaseWallet"));
    if !has_extension {
        return Err(WalletError::not_found(WalletKind::WalletLink));
    }

    let chain = chains::describe_chain(chain_id);
    let rpc_url = config
        .rpc_url_for(&chain)
        .ok_or_else(|| WalletError::not_found(WalletKind::WalletLink))?;
    env.make_web3_provider(app_name, &rpc_url, chain_id)
        .map_err(|e| WalletError::rpc(&e))
}
