mod common;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{address, Bytes, U256};
use serde_json::json;

use connect_wallet_adapters::{InjectedProvider, StaticEnvironment, WalletRpcClient};
use connect_wallet_core::{ContractCall, ErrorReason, PortError, RpcClientPort, WalletHandle};

use common::{account_a, connected_metamask, facade, handle};

fn erc20() -> JsonAbi {
    serde_json::from_value(json!([
        {
            "type": "function",
            "name": "balanceOf",
            "stateMutability": "view",
            "inputs": [{ "name": "owner", "type": "address" }],
            "outputs": [{ "name": "", "type": "uint256" }]
        },
        {
            "type": "function",
            "name": "decimals",
            "stateMutability": "view",
            "inputs": [],
            "outputs": [{ "name": "", "type": "uint8" }]
        }
    ]))
    .expect("valid abi")
}

fn word(value: u64) -> Bytes {
    Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec())
}

#[tokio::test]
async fn balance_is_read_through_the_wallet() {
    let wallet = InjectedProvider::deterministic();
    let wei = U256::from(5_000_000_000_000_000_000u128);
    wallet.set_balance(account_a(), wei);
    let facade = connected_metamask(&wallet, 1).await;

    assert_eq!(facade.get_balance(account_a()).await.expect("balance"), wei);
    let other = address!("3000000000000000000000000000000000000003");
    assert_eq!(facade.get_balance(other).await.expect("zero"), U256::ZERO);
}

#[tokio::test]
async fn registered_contract_calls_decode_their_output() {
    let wallet = InjectedProvider::deterministic();
    let token = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    wallet.set_call_result(token, word(1_000));
    let mut facade = connected_metamask(&wallet, 1).await;

    let registered = facade.add_contract("usdt", token, erc20());
    assert_eq!(registered.address, token);
    assert!(facade.contract("usdt").is_some());

    let value = facade
        .call_contract("usdt", "balanceOf", vec![account_a().to_string()])
        .await
        .expect("call");
    assert_eq!(value, json!("1000"));

    let value = facade
        .call_contract("usdt", "balanceOf(address)", vec![account_a().to_string()])
        .await
        .expect("call by signature");
    assert_eq!(value, json!("1000"));
    assert!(wallet.requests().iter().any(|m| m == "eth_call"));
}

#[tokio::test]
async fn contract_call_errors_surface_as_rpc_errors() {
    let wallet = InjectedProvider::deterministic();
    let mut facade = connected_metamask(&wallet, 1).await;

    let err = facade
        .call_contract("missing", "balanceOf", Vec::new())
        .await
        .expect_err("unknown contract");
    assert_eq!(err.reason, ErrorReason::Rpc);
    assert!(err.message.text.contains("missing"));

    facade.add_contract("usdt", address!("dac17f958d2ee523a2206206994597c13d831ec7"), erc20());
    let err = facade
        .call_contract("usdt", "balanceOf", Vec::new())
        .await
        .expect_err("wrong arity");
    assert!(err.message.text.contains("takes 0 arguments"));
}

#[tokio::test]
async fn re_adding_a_contract_replaces_it() {
    let mut facade = facade(StaticEnvironment::new());
    let first = address!("1111111111111111111111111111111111111111");
    let second = address!("2222222222222222222222222222222222222222");
    facade.add_contract("token", first, erc20());
    let replaced = facade.add_contract("token", second, erc20());
    assert_eq!(replaced.address, second);
    assert_eq!(facade.contract("token").map(|c| c.address), Some(second));
}

#[tokio::test]
async fn rpc_operations_require_a_connection() {
    let facade = facade(StaticEnvironment::new());
    let err = facade.get_balance(account_a()).await.expect_err("not connected");
    assert_eq!(err.reason, ErrorReason::NotConnected);
    let err = facade
        .sign_message(account_a(), "hello")
        .await
        .expect_err("not connected");
    assert_eq!(err.reason, ErrorReason::NotConnected);
}

#[tokio::test]
async fn personal_sign_returns_a_stable_signature() {
    let wallet = InjectedProvider::deterministic();
    let facade = connected_metamask(&wallet, 1).await;

    let first = facade.sign_message(account_a(), "hello").await.expect("sign");
    let again = facade.sign_message(account_a(), "hello").await.expect("sign");
    let other = facade.sign_message(account_a(), "bye").await.expect("sign");
    assert_eq!(first.len(), 65);
    assert_eq!(first[64], 27);
    assert_eq!(first, again);
    assert_ne!(first, other);
}

#[tokio::test]
async fn rejected_signature_keeps_the_wallet_error() {
    let wallet = InjectedProvider::deterministic();
    wallet.reject("personal_sign", PortError::rpc(4001, "User denied message signature."));
    let facade = connected_metamask(&wallet, 1).await;

    let err = facade.sign_message(account_a(), "hello").await.expect_err("denied");
    assert_eq!(err.reason, ErrorReason::Rpc);
    assert!(err.message.text.contains("4001"));
}

#[tokio::test]
async fn rpc_adapter_follows_the_latest_provider() {
    let first = InjectedProvider::deterministic();
    let second = InjectedProvider::deterministic();
    second.set_balance(account_a(), U256::from(42u64));

    let mut rpc = WalletRpcClient::from_provider(handle(&first));
    assert_eq!(rpc.get_balance(account_a()).await.expect("first"), U256::ZERO);

    let next: WalletHandle = handle(&second);
    rpc.set_provider(next);
    assert_eq!(rpc.get_balance(account_a()).await.expect("second"), U256::from(42u64));

    let call = ContractCall {
        address: address!("dac17f958d2ee523a2206206994597c13d831ec7"),
        abi: erc20(),
        method: "decimals".to_owned(),
        args: Vec::new(),
    };
    second.set_call_result(call.address, word(6));
    assert_eq!(rpc.call_contract(&call).await.expect("decimals"), json!("6"));
}

#[tokio::test]
async fn pending_receipt_reads_as_none() {
    let wallet = InjectedProvider::deterministic();
    let rpc = WalletRpcClient::from_provider(handle(&wallet));
    let receipt = rpc
        .get_transaction_receipt(common::tx_hash(0x01))
        .await
        .expect("query");
    assert!(receipt.is_none());
}
