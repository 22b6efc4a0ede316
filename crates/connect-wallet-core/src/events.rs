//! Wallet event stream.
//!
//! Wallet callbacks only enqueue raw payloads; normalization (re-resolving the chain,
//! re-requesting accounts) runs when the consumer pulls, so events come out strictly in
//! callback order. A `chainChanged` onto a chain other than the requested one yields the
//! update first and then a chain-mismatch error; the stream stays open after errors.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use alloy::primitives::Address;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chains;
use crate::connector::{session, WalletSession};
use crate::domain::{AccountInfo, ProviderTagged, WalletEvent, WalletEventKind};
use crate::errors::WalletError;
use crate::ports::{ListenerId, PortError, WalletHandle};
use crate::state_machine::ConnectorAction;

pub type EventItem = Result<WalletEvent, WalletError>;

#[derive(Debug, Clone)]
pub struct RawWalletEvent {
    pub kind: WalletEventKind,
    pub payload: Value,
}

/// Listener registrations on one wallet handle. Cancelling removes them from the wallet
/// and ends every stream built on this subscription. Clones share the registration.
#[derive(Debug, Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

#[derive(Debug)]
struct SubscriptionInner {
    handle: WalletHandle,
    listeners: Mutex<Vec<ListenerId>>,
    token: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(handle: WalletHandle) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                handle,
                listeners: Mutex::new(Vec::new()),
                token: CancellationToken::new(),
            }),
        }
    }

    pub(crate) fn track(&self, id: ListenerId) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    pub fn downgrade(&self) -> WeakSubscription {
        WeakSubscription(Arc::downgrade(&self.inner))
    }

    /// Idempotent. Listener removal is best-effort: a wallet that refuses is logged.
    pub fn cancel(&self) {
        self.inner.token.cancel();
        let ids = std::mem::take(
            &mut *self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for id in ids {
            if let Err(e) = self.inner.handle.remove_listener(id) {
                warn!(listener = id.0, error = %e, "wallet listener removal failed");
            }
        }
    }
}

/// Non-owning reference kept by the facade so `reset_connect` can tear down streams
/// it handed out without keeping their listeners alive.
#[derive(Debug, Clone)]
pub struct WeakSubscription(Weak<SubscriptionInner>);

impl WeakSubscription {
    pub fn cancel(&self) {
        if let Some(inner) = self.0.upgrade() {
            Subscription { inner }.cancel();
        }
    }

    pub fn is_live(&self) -> bool {
        self.0.upgrade().is_some_and(|inner| !inner.token.is_cancelled())
    }
}

impl Drop for SubscriptionInner {
    fn drop(&mut self) {
        let ids = std::mem::take(self.listeners.get_mut().unwrap_or_else(PoisonError::into_inner));
        for id in ids {
            let _ = self.handle.remove_listener(id);
        }
    }
}

pub struct EventStream {
    session: WalletSession,
    rx: UnboundedReceiver<RawWalletEvent>,
    subscription: Subscription,
    pending: VecDeque<EventItem>,
    provider_type: Option<String>,
}

impl EventStream {
    pub(crate) fn new(
        session: WalletSession,
        rx: UnboundedReceiver<RawWalletEvent>,
        subscription: Subscription,
    ) -> Self {
        Self {
            session,
            rx,
            subscription,
            pending: VecDeque::new(),
            provider_type: None,
        }
    }

    /// Tags every emitted event and error with `type`.
    pub fn with_provider_type(mut self, provider_type: Option<String>) -> Self {
        self.provider_type = provider_type;
        self
    }

    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    pub fn cancel(&self) {
        self.subscription.cancel();
    }

    /// Next event or error. `None` only after cancellation, or once the wallet has
    /// dropped every listener.
    pub async fn next(&mut self) -> Option<EventItem> {
        loop {
            if let Some(mut item) = self.pending.pop_front() {
                item.set_provider_type(self.provider_type.clone());
                return Some(item);
            }
            let token = self.subscription.token();
            let raw = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                raw = self.rx.recv() => raw?,
            };
            self.normalize(raw).await;
        }
    }

    /// Non-blocking variant of [`next`](Self::next) for hosts that poll from a frame loop.
    /// Suppressed events are skipped, so `None` means nothing deliverable is queued.
    pub async fn try_next(&mut self) -> Option<EventItem> {
        while self.pending.is_empty() && !self.subscription.is_cancelled() {
            let raw = self.rx.try_recv().ok()?;
            self.normalize(raw).await;
        }
        let mut item = self.pending.pop_front()?;
        item.set_provider_type(self.provider_type.clone());
        Some(item)
    }

    async fn normalize(&mut self, raw: RawWalletEvent) {
        debug!(wallet = %self.session.kind(), event = raw.kind.as_str(), "wallet event");
        match raw.kind {
            WalletEventKind::AccountsChanged => self.on_accounts_changed(&raw.payload).await,
            WalletEventKind::ChainChanged => self.on_chain_changed(&raw.payload).await,
            WalletEventKind::Connect => self.on_connect(&raw.payload),
            WalletEventKind::Disconnect => {
                self.pending.push_back(Err(WalletError::disconnected()));
            }
        }
    }

    async fn on_accounts_changed(&mut self, payload: &Value) {
        let accounts = match session::parse_accounts(payload) {
            Ok(accounts) => accounts,
            Err(e) => {
                self.pending.push_back(Err(WalletError::rpc(&e)));
                return;
            }
        };
        let Some(address) = accounts.first().copied() else {
            self.pending.push_back(Err(WalletError::not_authorized()));
            return;
        };
        let tracks = self.session.profile().tracks_address;
        if tracks && self.session.is_known_address(address) {
            debug!(%address, "accountsChanged without an address change; suppressed");
            return;
        }
        let item = self
            .session
            .current_chain()
            .await
            .map(|network| {
                WalletEvent::new(
                    WalletEventKind::AccountsChanged,
                    AccountInfo::new(address, network),
                )
            });
        // Only a delivered change becomes the known address.
        if tracks && item.is_ok() {
            self.session.observe_address(address);
        }
        self.pending.push_back(item);
    }

    async fn on_chain_changed(&mut self, payload: &Value) {
        let network = match session::chain_from_json(payload) {
            Ok(network) => network,
            Err(e) => {
                self.pending.push_back(Err(WalletError::rpc(&e)));
                return;
            }
        };

        match self.session.request_accounts().await {
            Ok(accounts) => match accounts.first().copied() {
                Some(address) => {
                    if self.session.profile().tracks_address {
                        self.session.observe_address(address);
                    }
                    self.pending.push_back(Ok(WalletEvent::new(
                        WalletEventKind::ChainChanged,
                        AccountInfo::new(address, network.clone()),
                    )));
                }
                None => self.pending.push_back(Err(WalletError::no_address())),
            },
            Err(e) => self.pending.push_back(Err(WalletError::rpc(&e))),
        }

        let requested = self.session.network().chain_id;
        if network.numeric_id == requested {
            self.session.lifecycle().advance(ConnectorAction::Reconciled);
        } else {
            self.session
                .lifecycle()
                .advance(ConnectorAction::ChainMismatch);
            self.pending
                .push_back(Err(WalletError::chain_mismatch(&chains::describe_chain(
                    requested,
                ))));
        }
    }

    fn on_connect(&mut self, payload: &Value) {
        self.pending.push_back(connect_event(payload));
    }
}

/// WalletConnect's `connect` payload: `{ "accounts": [...], "chainId": .. }`, or
/// `{ "error": .. }` when pairing failed.
fn connect_event(payload: &Value) -> EventItem {
    if payload.get("error").is_some_and(|e| !e.is_null()) {
        return Err(WalletError::not_authorized());
    }
    let accounts = payload
        .get("accounts")
        .map(session::parse_accounts)
        .transpose()
        .map_err(|e| WalletError::rpc(&e))?
        .unwrap_or_default();
    let address: Address = *accounts.first().ok_or_else(WalletError::no_address)?;
    let chain = payload
        .get("chainId")
        .ok_or_else(|| PortError::Validation("connect payload without chainId".to_owned()))
        .and_then(session::chain_from_json)
        .map_err(|e| WalletError::rpc(&e))?;
    Ok(WalletEvent::new(
        WalletEventKind::Connect,
        AccountInfo::new(address, chain),
    ))
}
