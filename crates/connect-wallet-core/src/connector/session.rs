use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::Address;
use serde_json::{json, Value};
use tracing::debug;

use crate::chains::{self, ChainDescriptor};
use crate::connector::Lifecycle;
use crate::domain::{AccountInfo, NetworkRequest, WalletEventKind, WalletKind};
use crate::errors::WalletError;
use crate::events::{EventStream, RawWalletEvent, Subscription};
use crate::ports::{PortError, WalletHandle};
use crate::reconcile::{check_net, Reconciliation};
use crate::state_machine::ConnectorAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountsSource {
    /// `eth_requestAccounts`, prompting when needed.
    RequestAccounts,
    /// `eth_accounts` on an already paired session.
    Accounts,
    /// Legacy `enable()`.
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSource {
    ChainId,
    NetVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantProfile {
    pub reconciles: bool,
    pub accounts: AccountsSource,
    pub chain: ChainSource,
    /// Suppress `accountsChanged` when the address did not actually change.
    pub tracks_address: bool,
    pub events: &'static [WalletEventKind],
}

/// A connected wallet: the handle acquired by `connect` plus what the variant needs to
/// query it.
#[derive(Debug, Clone)]
pub struct WalletSession {
    kind: WalletKind,
    profile: VariantProfile,
    handle: WalletHandle,
    network: NetworkRequest,
    lifecycle: Lifecycle,
    known_address: Arc<Mutex<Option<Address>>>,
}

impl WalletSession {
    pub(crate) fn new(
        kind: WalletKind,
        profile: VariantProfile,
        handle: WalletHandle,
        network: NetworkRequest,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            kind,
            profile,
            handle,
            network,
            lifecycle,
            known_address: Arc::new(Mutex::new(None)),
        }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    pub fn profile(&self) -> VariantProfile {
        self.profile
    }

    pub fn handle(&self) -> &WalletHandle {
        &self.handle
    }

    pub fn network(&self) -> &NetworkRequest {
        &self.network
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub async fn check_net(&self) -> Result<Reconciliation, WalletError> {
        if !self.profile.reconciles {
            return Ok(Reconciliation::AlreadyActive);
        }
        match check_net(self.handle.as_ref(), &self.network).await {
            Ok(outcome) => {
                self.lifecycle.advance(ConnectorAction::Reconciled);
                Ok(outcome)
            }
            Err(err) => {
                self.lifecycle.advance(ConnectorAction::ChainMismatch);
                Err(err)
            }
        }
    }

    pub async fn get_accounts(&self) -> Result<AccountInfo, WalletError> {
        self.check_net().await?;

        let accounts = self.request_accounts().await.map_err(|e| {
            debug!(wallet = %self.kind, error = %e, "account request failed");
            WalletError::user_rejected_connect("User rejected the connect")
        })?;
        let Some(address) = accounts.first().copied() else {
            return Err(WalletError::not_authorized());
        };
        let network = self.current_chain().await?;
        if self.profile.tracks_address {
            self.observe_address(address);
        }
        Ok(AccountInfo::new(address, network))
    }

    pub async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        let raw = match self.profile.accounts {
            AccountsSource::RequestAccounts => {
                self.handle.request("eth_requestAccounts", json!([])).await?
            }
            AccountsSource::Accounts => self.handle.request("eth_accounts", json!([])).await?,
            AccountsSource::Enable => Value::from(self.handle.enable().await?),
        };
        parse_accounts(&raw)
    }

    pub async fn current_chain(&self) -> Result<ChainDescriptor, WalletError> {
        let method = match self.profile.chain {
            ChainSource::ChainId => "eth_chainId",
            ChainSource::NetVersion => "net_version",
        };
        let raw = self
            .handle
            .request(method, json!([]))
            .await
            .map_err(|e| WalletError::rpc(&e))?;
        chain_from_json(&raw).map_err(|e| WalletError::rpc(&e))
    }

    /// Records `address` as the current one. Returns `false` when it equals the address
    /// already known; addresses compare by value so hex case does not matter.
    pub fn observe_address(&self, address: Address) -> bool {
        let mut known = self
            .known_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *known == Some(address) {
            return false;
        }
        *known = Some(address);
        true
    }

    pub fn is_known_address(&self, address: Address) -> bool {
        *self
            .known_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == Some(address)
    }

    pub fn subscribe(&self) -> Result<EventStream, WalletError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = Subscription::new(self.handle.clone());
        for kind in self.profile.events {
            let kind = *kind;
            let tx = tx.clone();
            let id = self
                .handle
                .on(
                    kind,
                    Box::new(move |payload: Value| {
                        // Receiver gone means the stream was dropped; nothing to deliver.
                        let _ = tx.send(RawWalletEvent { kind, payload });
                    }),
                )
                .map_err(|e| WalletError::rpc(&e))?;
            subscription.track(id);
        }
        self.lifecycle.advance(ConnectorAction::Subscribe);
        debug!(wallet = %self.kind, events = self.profile.events.len(), "wallet events subscribed");
        Ok(EventStream::new(self.clone(), rx, subscription))
    }
}

pub(crate) fn parse_accounts(raw: &Value) -> Result<Vec<Address>, PortError> {
    let items = raw
        .as_array()
        .ok_or_else(|| PortError::Validation("accounts result must be an array".to_owned()))?;
    items
        .iter()
        .map(|item| {
            let s = item
                .as_str()
                .ok_or_else(|| PortError::Validation("account must be a string".to_owned()))?;
            s.parse::<Address>()
                .map_err(|e| PortError::Validation(format!("invalid account '{s}': {e}")))
        })
        .collect()
}

pub(crate) fn chain_from_json(raw: &Value) -> Result<ChainDescriptor, PortError> {
    match raw {
        Value::String(s) => chains::resolve_reported(s),
        other => chains::chain_id_from_json(other).map(chains::describe_chain),
    }
}
