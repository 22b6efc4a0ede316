mod common;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use connect_wallet_adapters::{InjectedProvider, StaticEnvironment};
use connect_wallet_core::{ConnectWallet, NetworkRequest, PollPolicy, PortError, TxError};

use common::{
    config, connected_metamask, facade, metamask_env, mined_receipt, tx_hash, TestClock, TestFacade,
};

fn receipt_queries(wallet: &InjectedProvider) -> usize {
    wallet
        .requests()
        .iter()
        .filter(|m| *m == "eth_getTransactionReceipt")
        .count()
}

#[tokio::test]
async fn mined_transaction_notifies_every_subscriber_once() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;
    let mut first = facade.tx_subscribe();
    let mut second = facade.tx_subscribe();

    let hash = tx_hash(0x11);
    wallet.push_receipt(hash, Value::Null);
    wallet.push_receipt(hash, Value::Null);
    wallet.push_receipt(hash, mined_receipt(hash, 1_234, true));

    let receipt = facade.tx_check(hash).await.expect("mined");
    assert_eq!(receipt.block_number, Some(1_234));
    assert_eq!(receipt.status, Some(true));
    assert_eq!(receipt_queries(&wallet), 3);

    assert_eq!(first.try_next(), Some(hash));
    assert_eq!(second.try_next(), Some(hash));
    assert_eq!(first.try_next(), None);
    assert_eq!(second.try_next(), None);
}

#[tokio::test]
async fn hashes_are_delivered_in_completion_order() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;
    let mut sub = facade.tx_subscribe();

    let (a, b) = (tx_hash(0xa0), tx_hash(0xb0));
    wallet.push_receipt(a, mined_receipt(a, 10, true));
    wallet.push_receipt(b, mined_receipt(b, 11, true));
    facade.tx_check(b).await.expect("b mined");
    facade.tx_check(a).await.expect("a mined");

    assert_eq!(sub.next().await, Some(b));
    assert_eq!(sub.next().await, Some(a));
}

#[tokio::test]
async fn dropped_subscriber_does_not_block_the_others() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;
    let dropped = facade.tx_subscribe();
    let mut kept = facade.tx_subscribe();
    drop(dropped);

    let hash = tx_hash(0x22);
    wallet.push_receipt(hash, mined_receipt(hash, 7, true));
    facade.tx_check(hash).await.expect("mined");
    assert_eq!(kept.try_next(), Some(hash));
}

#[tokio::test]
async fn reverted_transaction_fails_without_notifying() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;
    let mut sub = facade.tx_subscribe();

    let hash = tx_hash(0x33);
    wallet.push_receipt(hash, mined_receipt(hash, 99, false));

    let err = facade.tx_check(hash).await.expect_err("reverted");
    assert!(
        matches!(err, TxError::Reverted { hash: h, block_number: 99 } if h == hash),
        "unexpected error: {err:?}"
    );
    assert_eq!(sub.try_next(), None);
}

#[tokio::test]
async fn receipt_query_error_ends_the_watch() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;
    wallet.reject(
        "eth_getTransactionReceipt",
        PortError::Transport("node unreachable".to_owned()),
    );

    let err = facade.tx_check(tx_hash(0x44)).await.expect_err("rpc error");
    assert!(matches!(err, TxError::Rpc(PortError::Transport(_))), "{err:?}");
    assert_eq!(receipt_queries(&wallet), 1);
}

#[tokio::test]
async fn capped_policy_gives_up_after_max_attempts() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1)
        .await
        .with_poll_policy(PollPolicy::default().with_max_attempts(3));

    let err = facade.tx_check(tx_hash(0x55)).await.expect_err("never mined");
    assert!(matches!(err, TxError::Exhausted { attempts: 3 }), "{err:?}");
    assert_eq!(receipt_queries(&wallet), 3);
}

#[tokio::test]
async fn cancellation_stops_polling() {
    let wallet = InjectedProvider::deterministic();
    let token = CancellationToken::new();
    let mut facade: TestFacade = ConnectWallet::new(
        metamask_env(&wallet),
        TestClock::cancelling(2, token.clone()),
        "connect-wallet-tests",
    );
    let result = facade
        .connect(&config("MetaMask"), NetworkRequest::new(1), None)
        .await;
    assert!(result.connected);

    let err = facade
        .tx_check_with(tx_hash(0x66), &token)
        .await
        .expect_err("cancelled");
    assert!(matches!(err, TxError::Cancelled), "{err:?}");
    assert_eq!(receipt_queries(&wallet), 2);
}

#[tokio::test]
async fn already_cancelled_token_makes_no_query() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;
    let token = CancellationToken::new();
    token.cancel();

    let err = facade
        .tx_check_with(tx_hash(0x77), &token)
        .await
        .expect_err("cancelled");
    assert!(matches!(err, TxError::Cancelled));
    assert_eq!(receipt_queries(&wallet), 0);
}

#[tokio::test]
async fn tx_check_requires_a_connection() {
    let facade = facade(StaticEnvironment::new());
    let err = facade.tx_check(tx_hash(0x88)).await.expect_err("not connected");
    assert!(matches!(err, TxError::NotConnected));
}
