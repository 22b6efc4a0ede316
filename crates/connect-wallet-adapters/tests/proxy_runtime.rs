mod common;

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};

use connect_wallet_adapters::{ConnectAdapterConfig, InjectedProvider, RuntimeProfile};
use connect_wallet_core::{ErrorReason, NetworkRequest, PortError, WalletEventKind, WalletProvider};

use common::{account_a, account_b, config, facade};

#[derive(Debug)]
struct MockWallet {
    accounts: Vec<String>,
    chain_id: String,
    methods: Vec<String>,
}

fn spawn_mock_wallet(state: Arc<Mutex<MockWallet>>) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    let join = thread::spawn(move || {
        for _ in 0..64 {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            if req.as_reader().read_to_string(&mut body).is_err() {
                break;
            }
            let call: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let id = call.get("id").cloned().unwrap_or(Value::Null);
            let method = call
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();

            let reply = {
                let mut wallet = state.lock().expect("mock state");
                wallet.methods.push(method.clone());
                match method.as_str() {
                    "eth_accounts" | "eth_requestAccounts" => {
                        json!({ "jsonrpc": "2.0", "id": id, "result": wallet.accounts })
                    }
                    "eth_chainId" => {
                        json!({ "jsonrpc": "2.0", "id": id, "result": wallet.chain_id })
                    }
                    "wallet_switchEthereumChain" => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": 4001, "message": "User rejected the request." }
                    }),
                    _ => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32601, "message": "method not found" }
                    }),
                }
            };

            let response =
                Response::from_string(reply.to_string()).with_status_code(StatusCode(200));
            let _ = req.respond(response);
        }
    });

    (addr, join)
}

fn mock_state() -> Arc<Mutex<MockWallet>> {
    Arc::new(Mutex::new(MockWallet {
        accounts: vec![account_a().to_string()],
        chain_id: "0x1".to_owned(),
        methods: Vec::new(),
    }))
}

#[tokio::test]
async fn proxy_forwards_requests_and_keeps_wallet_error_codes() {
    let state = mock_state();
    let (base_url, _join) = spawn_mock_wallet(Arc::clone(&state));
    let wallet = InjectedProvider::proxy(base_url, 5_000, &["isMetaMask"]).expect("proxy");
    assert_eq!(wallet.mode_name(), "proxy");
    assert!(wallet.flag("isMetaMask"));

    let chain = wallet.request("eth_chainId", json!([])).await.expect("chain id");
    assert_eq!(chain, json!("0x1"));

    let err = wallet
        .request("wallet_switchEthereumChain", json!([{ "chainId": "0x38" }]))
        .await
        .expect_err("rejected");
    assert!(err.is_user_rejection(), "{err:?}");

    let err = wallet
        .request("eth_sign", json!([]))
        .await
        .expect_err("unsupported");
    assert_eq!(err.rpc_code(), Some(-32601));

    let methods = state.lock().expect("state").methods.clone();
    assert_eq!(
        methods,
        vec!["eth_chainId", "wallet_switchEthereumChain", "eth_sign"]
    );
}

#[tokio::test]
async fn facade_connects_through_the_proxy() {
    let state = mock_state();
    let (base_url, _join) = spawn_mock_wallet(Arc::clone(&state));
    let wallet = InjectedProvider::proxy(base_url, 5_000, &["isMetaMask"]).expect("proxy");
    let env = common::metamask_env(&wallet);
    let mut facade = facade(env);

    let result = facade
        .connect(&config("MetaMask"), NetworkRequest::new(1), None)
        .await;
    assert!(result.connected);
    let info = facade.get_accounts().await.expect("accounts");
    assert_eq!(info.address, account_a());
    assert_eq!(info.network.display_name, "mainnet");

    let mut facade = common::facade(common::metamask_env(&wallet));
    facade
        .connect(&config("MetaMask"), NetworkRequest::new(56), None)
        .await;
    let err = facade.get_accounts().await.expect_err("switch refused");
    assert_eq!(err.reason, ErrorReason::UserRejectedSwitch);
}

#[tokio::test]
async fn polling_the_proxy_raises_change_events() {
    let state = mock_state();
    let (base_url, _join) = spawn_mock_wallet(Arc::clone(&state));
    let wallet = InjectedProvider::proxy(base_url, 5_000, &["isMetaMask"]).expect("proxy");
    let mut facade = facade(common::metamask_env(&wallet));
    facade
        .connect(&config("MetaMask"), NetworkRequest::new(1), None)
        .await;
    facade.get_accounts().await.expect("first observation");
    let mut stream = facade.event_subscriber().expect("subscribe");

    wallet.poll_events().await.expect("poll unchanged");
    assert!(stream.try_next().await.is_none());

    state.lock().expect("state").accounts = vec![account_b().to_string()];
    wallet.poll_events().await.expect("poll changed");
    let event = stream.next().await.expect("open").expect("event");
    assert_eq!(event.name, WalletEventKind::AccountsChanged);
    assert_eq!(event.address, account_b());
}

#[tokio::test]
async fn unreachable_proxy_is_a_transport_error() {
    let wallet = InjectedProvider::proxy("http://127.0.0.1:9", 500, &[]).expect("client");
    let err = wallet
        .request("eth_chainId", json!([]))
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, PortError::Transport(_)), "{err:?}");
}

#[test]
fn production_profile_without_proxy_disables_the_wallet() {
    let config = ConnectAdapterConfig {
        runtime_profile: RuntimeProfile::Production,
        wallet_proxy_url: None,
        ..ConnectAdapterConfig::default()
    };
    let wallet = InjectedProvider::with_config(&config);
    assert_eq!(wallet.mode_name(), "disabled");
    let err = wallet
        .on(WalletEventKind::AccountsChanged, Box::new(|_| {}))
        .expect_err("disabled");
    assert!(matches!(err, PortError::Policy(_)));

    let dev = InjectedProvider::with_config(&ConnectAdapterConfig::default());
    assert_eq!(dev.mode_name(), "deterministic");
}
