use serde::{Deserialize, Serialize};

use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Connected,
    EventStreaming,
    NetworkMismatch,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorAction {
    Connect,
    Found,
    Fail,
    Subscribe,
    ChainMismatch,
    Reconciled,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ConnectorState,
    pub to: ConnectorState,
    pub reason: &'static str,
}

/// Connect attempts settle exactly once: `Found` and `Fail` are only legal from
/// `Connecting`, so a second settlement of the same attempt is rejected here.
pub fn connector_transition(
    state: ConnectorState,
    action: ConnectorAction,
) -> Result<(ConnectorState, StateTransition), PortError> {
    use ConnectorAction as A;
    use ConnectorState as S;

    let (to, reason) = match (state, action) {
        (S::Disconnected | S::Failed, A::Connect) => (S::Connecting, "connect_started"),
        (S::Connecting, A::Found) => (S::Connected, "wallet_found"),
        (S::Connecting, A::Fail) => (S::Failed, "connect_failed"),
        (S::Connected | S::EventStreaming, A::Subscribe) => {
            (S::EventStreaming, "events_subscribed")
        }
        (S::Connected | S::EventStreaming, A::ChainMismatch) => {
            (S::NetworkMismatch, "chain_mismatch")
        }
        (S::NetworkMismatch, A::ChainMismatch) => (S::NetworkMismatch, "chain_mismatch"),
        (S::NetworkMismatch | S::Connected, A::Reconciled) => (S::Connected, "reconciled"),
        (S::EventStreaming, A::Reconciled) => (S::EventStreaming, "reconciled"),
        (S::NetworkMismatch, A::Subscribe) => (S::NetworkMismatch, "events_subscribed"),
        (_, A::Reset) => (S::Disconnected, "reset"),
        (from, action) => {
            return Err(PortError::Validation(format!(
                "illegal connector transition: {from:?} --{action:?}-->"
            )))
        }
    };

    Ok((
        to,
        StateTransition {
            from: state,
            to,
            reason,
        },
    ))
}
