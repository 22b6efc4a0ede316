use crate::domain::{WalletEventKind, WalletKind};
use crate::errors::WalletError;
use crate::ports::{WalletEnvironment, WalletHandle};

use super::{AccountsSource, ChainSource, VariantProfile};

pub(super) const PROFILE: VariantProfile = VariantProfile {
    reconciles: true,
    accounts: AccountsSource::RequestAccounts,
    chain: ChainSource::ChainId,
    tracks_address: false,
    events: &[WalletEventKind::AccountsChanged, WalletEventKind::ChainChanged],
};

pub(super) fn probe(env: &dyn WalletEnvironment) -> Result<WalletHandle, WalletError> {
    env.injected("ethereum")
        .ok_or_else(|| WalletError::not_found(WalletKind::MetaMask))
}
