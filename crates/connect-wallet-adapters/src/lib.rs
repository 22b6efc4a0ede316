pub mod abi;
pub mod clock;
pub mod config;
pub mod eip1193;
pub mod environment;
pub mod rpc;

pub use clock::SystemClockAdapter;
pub use config::{ConfigError, ConnectAdapterConfig, RuntimeProfile};
pub use eip1193::InjectedProvider;
#[cfg(target_arch = "wasm32")]
pub use environment::BrowserEnvironment;
pub use environment::StaticEnvironment;
pub use rpc::WalletRpcClient;
