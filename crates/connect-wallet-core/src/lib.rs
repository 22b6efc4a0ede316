pub mod chains;
pub mod connector;
pub mod domain;
pub mod errors;
pub mod events;
pub mod facade;
pub mod ports;
pub mod reconcile;
pub mod state_machine;
pub mod tx;

pub use chains::{ChainDescriptor, ChainEntry, ChainRegistry};
pub use connector::{Connector, Lifecycle, VariantProfile, WalletSession};
pub use domain::{
    AccountInfo, ConnectionResult, ContractHandle, NativeCurrency, NetworkRequest,
    ProviderConfig, ProviderSource, ProviderTagged, Settings, StatusCode, TxReceipt, WalletEvent,
    WalletEventKind, WalletKind,
};
pub use errors::{DisplayMessage, ErrorReason, TxError, WalletError};
pub use events::{EventItem, EventStream, Subscription, WeakSubscription};
pub use facade::ConnectWallet;
pub use ports::{
    ClockPort, ContractCall, Listener, ListenerId, PortError, RpcClientPort, WalletEnvironment,
    WalletHandle, WalletProvider,
};
pub use reconcile::Reconciliation;
pub use state_machine::{connector_transition, ConnectorAction, ConnectorState, StateTransition};
pub use tx::{PollPolicy, TxBroadcast, TxSubscription};
