#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use connect_wallet_adapters::{InjectedProvider, StaticEnvironment, WalletRpcClient};
use connect_wallet_core::{
    ClockPort, ConnectWallet, NetworkRequest, PortError, ProviderConfig, Settings, WalletHandle,
};

/// Sleeps return at once; every sleep is counted and can cancel a token after `n` of them.
#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
    sleeps: Arc<AtomicU64>,
    cancel_after: Option<(u64, CancellationToken)>,
}

impl TestClock {
    pub fn cancelling(after_sleeps: u64, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((after_sleeps, token)),
            ..Self::default()
        }
    }

    pub fn sleeps(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1_739_750_400_000)
    }

    async fn sleep_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
        let done = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if done >= *after {
                token.cancel();
            }
        }
        tokio::task::yield_now().await;
    }
}

pub type TestFacade = ConnectWallet<StaticEnvironment, WalletRpcClient, TestClock>;

pub fn facade(env: StaticEnvironment) -> TestFacade {
    ConnectWallet::new(env, TestClock::default(), "connect-wallet-tests")
}

pub fn handle(wallet: &InjectedProvider) -> WalletHandle {
    Arc::new(wallet.clone())
}

/// A MetaMask-style wallet injected as `ethereum`.
pub fn metamask_env(wallet: &InjectedProvider) -> StaticEnvironment {
    StaticEnvironment::new().with_global("ethereum", handle(wallet))
}

pub fn config(name: &str) -> ProviderConfig {
    ProviderConfig::named(name)
}

pub fn tagged() -> Option<Settings> {
    Some(Settings {
        provider_type: true,
    })
}

pub async fn connected_metamask(wallet: &InjectedProvider, chain_id: u64) -> TestFacade {
    let mut facade = facade(metamask_env(wallet));
    let result = facade
        .connect(&config("MetaMask"), NetworkRequest::new(chain_id), None)
        .await;
    assert!(result.connected, "metamask connect: {result:?}");
    facade
}

pub fn account_a() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid account a")
}

pub fn account_b() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid account b")
}

pub fn tx_hash(seed: u8) -> B256 {
    B256::repeat_byte(seed)
}

pub fn mined_receipt(hash: B256, block: u64, success: bool) -> Value {
    json!({
        "transactionHash": hash.to_string(),
        "blockNumber": format!("0x{block:x}"),
        "status": if success { "0x1" } else { "0x0" },
    })
}
