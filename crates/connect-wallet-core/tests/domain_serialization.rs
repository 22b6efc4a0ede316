use connect_wallet_core::{
    chains, AccountInfo, ConnectionResult, NativeCurrency, NetworkRequest, ProviderTagged,
    StatusCode, WalletError, WalletKind,
};

#[test]
fn unsupported_provider_result_shape() {
    let result = ConnectionResult::failed(WalletError::unsupported_provider("NotAWallet"));
    let json = serde_json::to_value(&result).expect("serialize result");
    assert_eq!(json["code"], 2);
    assert_eq!(json["connected"], false);
    assert!(json.get("type").is_none());
    assert!(json["message"]["text"].as_str().is_some());
}

#[test]
fn provider_type_tag_is_serialized_only_when_set() {
    let mut info = AccountInfo::new(
        "0x1000000000000000000000000000000000000001"
            .parse()
            .expect("address"),
        chains::describe_chain(1),
    );
    let json = serde_json::to_value(&info).expect("serialize");
    assert!(json.get("type").is_none());

    info.set_provider_type(Some(WalletKind::MetaMask.name().to_owned()));
    let json = serde_json::to_value(&info).expect("serialize");
    assert_eq!(json["type"], "MetaMask");
    assert_eq!(json["network"]["chainID"], 1);
}

#[test]
fn add_chain_params_require_the_full_quad() {
    let bare = NetworkRequest::new(56);
    assert!(bare.add_chain_params().is_none());
    assert_eq!(bare.wire_chain_id(), "0x38");

    let full = NetworkRequest::new(56).with_add_chain_data(
        "BNB Smart Chain",
        NativeCurrency {
            name: "BNB".to_owned(),
            symbol: "BNB".to_owned(),
            decimals: 18,
        },
        "https://bsc-dataseed.binance.org",
        "https://bscscan.com",
    );
    let params = full.add_chain_params().expect("all four present");
    assert_eq!(params["chainId"], "0x38");
    assert_eq!(params["nativeCurrency"]["decimals"], 18);
}

#[test]
fn status_code_numbers_are_stable() {
    for (code, n) in [
        (StatusCode::Success, 1),
        (StatusCode::NotFound, 2),
        (StatusCode::NotAuthorized, 3),
        (StatusCode::ChainMismatch, 4),
        (StatusCode::ModalClosed, 5),
        (StatusCode::Disconnected, 6),
        (StatusCode::NoAddress, 7),
    ] {
        assert_eq!(code.as_u8(), n);
        assert_eq!(StatusCode::from_u8(n), Some(code));
    }
}
