//! Per-wallet connectors.
//!
//! The four wallet kinds share one capability contract (`connect`, `get_accounts`,
//! `event_subscriber`). What differs between them is the presence probe and a small
//! profile of wallet methods; both are selected by matching on [`WalletKind`].

mod kardiachain;
mod metamask;
pub(crate) mod session;
mod walletconnect;
mod walletlink;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::domain::{AccountInfo, ConnectionResult, NetworkRequest, ProviderConfig, WalletKind};
use crate::errors::WalletError;
use crate::events::EventStream;
use crate::ports::{WalletEnvironment, WalletHandle};
use crate::reconcile::Reconciliation;
use crate::state_machine::{connector_transition, ConnectorAction, ConnectorState, StateTransition};

pub use session::{AccountsSource, ChainSource, VariantProfile, WalletSession};

/// Shared lifecycle cell; the connector, its session and its event streams all advance it.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    kind: WalletKind,
    state: Arc<Mutex<ConnectorState>>,
}

impl Lifecycle {
    fn new(kind: WalletKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(ConnectorState::Disconnected)),
        }
    }

    pub fn current(&self) -> ConnectorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `action` if it is legal from the current state. Illegal actions are
    /// logged and discarded, which is what makes the first settlement of a connect
    /// attempt final.
    pub fn advance(&self, action: ConnectorAction) -> Option<StateTransition> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match connector_transition(*state, action) {
            Ok((next, transition)) => {
                *state = next;
                debug!(
                    wallet = %self.kind,
                    from = ?transition.from,
                    to = ?transition.to,
                    reason = transition.reason,
                    "connector transition"
                );
                Some(transition)
            }
            Err(e) => {
                warn!(wallet = %self.kind, error = %e, "discarding connector action");
                None
            }
        }
    }
}

#[derive(Debug)]
pub struct Connector {
    kind: WalletKind,
    network: NetworkRequest,
    lifecycle: Lifecycle,
    session: Option<WalletSession>,
}

impl Connector {
    pub fn new(kind: WalletKind, network: NetworkRequest) -> Self {
        Self {
            kind,
            network,
            lifecycle: Lifecycle::new(kind),
            session: None,
        }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    pub fn network(&self) -> &NetworkRequest {
        &self.network
    }

    pub fn state(&self) -> ConnectorState {
        self.lifecycle.current()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn handle(&self) -> Option<WalletHandle> {
        self.session.as_ref().map(|s| s.handle().clone())
    }

    /// Single connect attempt: probe for the wallet, acquire its handle, settle once.
    pub async fn connect(
        &mut self,
        env: &dyn WalletEnvironment,
        config: &ProviderConfig,
        app_name: &str,
    ) -> Result<ConnectionResult, WalletError> {
        if self.lifecycle.advance(ConnectorAction::Connect).is_none() {
            // A previous attempt already settled as connected; keep it.
            if let Some(handle) = self.handle() {
                return Ok(ConnectionResult::connected(self.kind, handle));
            }
        }

        let chain_id = self.network.chain_id;
        let probed = match self.kind {
            WalletKind::MetaMask => metamask::probe(env),
            WalletKind::WalletConnect => walletconnect::open(env, config, chain_id).await,
            WalletKind::WalletLink => walletlink::probe(env, config, app_name, chain_id),
            WalletKind::KardiaChain => kardiachain::probe(env).await,
        };

        match probed {
            Ok(handle) => {
                self.lifecycle.advance(ConnectorAction::Found);
                self.session = Some(WalletSession::new(
                    self.kind,
                    profile(self.kind),
                    handle.clone(),
                    self.network.clone(),
                    self.lifecycle.clone(),
                ));
                info!(wallet = %self.kind, chain_id, "wallet connected");
                Ok(ConnectionResult::connected(self.kind, handle))
            }
            Err(err) => {
                self.lifecycle.advance(ConnectorAction::Fail);
                info!(wallet = %self.kind, error = %err, "wallet connect failed");
                Err(err)
            }
        }
    }

    /// Reconciles the wallet's chain with the requested one. Variants that do not
    /// reconcile report `AlreadyActive` without touching the wallet.
    pub async fn check_net(&self) -> Result<Reconciliation, WalletError> {
        self.session("checkNet")?.check_net().await
    }

    pub async fn get_accounts(&self) -> Result<AccountInfo, WalletError> {
        self.session("getAccounts")?.get_accounts().await
    }

    pub fn event_subscriber(&self) -> Result<EventStream, WalletError> {
        self.session("eventSubscriber")?.subscribe()
    }

    pub fn reset(&mut self) {
        self.lifecycle.advance(ConnectorAction::Reset);
        self.session = None;
    }

    fn session(&self, operation: &str) -> Result<&WalletSession, WalletError> {
        self.session
            .as_ref()
            .ok_or_else(|| WalletError::not_connected(operation))
    }
}

pub fn profile(kind: WalletKind) -> VariantProfile {
    match kind {
        WalletKind::MetaMask => metamask::PROFILE,
        WalletKind::WalletConnect => walletconnect::PROFILE,
        WalletKind::WalletLink => walletlink::PROFILE,
        WalletKind::KardiaChain => kardiachain::PROFILE,
    }
}
