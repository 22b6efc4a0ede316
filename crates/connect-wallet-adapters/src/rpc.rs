use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use connect_wallet_core::chains::parse_chain_id;
use connect_wallet_core::{ContractCall, PortError, RpcClientPort, TxReceipt, WalletHandle};

use crate::abi;

/// Chain queries sent through the connected wallet's own `request` channel.
#[derive(Debug, Clone)]
pub struct WalletRpcClient {
    provider: WalletHandle,
}

impl WalletRpcClient {
    pub fn provider(&self) -> &WalletHandle {
        &self.provider
    }
}

#[async_trait(?Send)]
impl RpcClientPort for WalletRpcClient {
    fn from_provider(provider: WalletHandle) -> Self {
        Self { provider }
    }

    fn set_provider(&mut self, provider: WalletHandle) {
        self.provider = provider;
    }

    async fn get_balance(&self, address: Address) -> Result<U256, PortError> {
        let raw = self
            .provider
            .request("eth_getBalance", json!([address.to_string(), "latest"]))
            .await?;
        let text = raw
            .as_str()
            .ok_or_else(|| {
                PortError::Validation("eth_getBalance must return a string".to_owned())
            })?;
        U256::from_str(text).map_err(|e| PortError::Validation(format!("invalid balance: {e}")))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, PortError> {
        let raw = self
            .provider
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if raw.is_null() {
            return Ok(None);
        }
        parse_receipt(hash, &raw).map(Some)
    }

    async fn call_contract(&self, call: &ContractCall) -> Result<Value, PortError> {
        let (function, data) = abi::encode_call(&call.abi, &call.method, &call.args)?;
        debug!(to = %call.address, method = %call.method, "eth_call");
        let raw = self
            .provider
            .request(
                "eth_call",
                json!([{ "to": call.address.to_string(), "data": data.to_string() }, "latest"]),
            )
            .await?;
        let output = raw
            .as_str()
            .ok_or_else(|| PortError::Validation("eth_call must return hex data".to_owned()))
            .and_then(|s| {
                Bytes::from_str(s)
                    .map_err(|e| PortError::Validation(format!("invalid eth_call result: {e}")))
            })?;
        abi::decode_output(function, &output)
    }

    async fn sign_message(&self, address: Address, message: &str) -> Result<Bytes, PortError> {
        let payload = Bytes::copy_from_slice(message.as_bytes());
        let raw = self
            .provider
            .request(
                "personal_sign",
                json!([payload.to_string(), address.to_string()]),
            )
            .await?;
        raw.as_str()
            .ok_or_else(|| PortError::Validation("signature must be a hex string".to_owned()))?
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid signature hex: {e}")))
    }
}

/// Receipts carry hex quantities; `blockNumber` is null while pending and `status` is
/// absent before Byzantium.
fn parse_receipt(requested: B256, raw: &Value) -> Result<TxReceipt, PortError> {
    let transaction_hash = match raw.get("transactionHash").and_then(Value::as_str) {
        Some(s) => s
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid receipt hash: {e}")))?,
        None => requested,
    };
    let quantity = |key: &str| -> Result<Option<u64>, PortError> {
        match raw.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => parse_chain_id(s).map(Some),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| PortError::Validation(format!("invalid receipt {key}"))),
            Some(_) => Err(PortError::Validation(format!("invalid receipt {key}"))),
        }
    };
    Ok(TxReceipt {
        transaction_hash,
        block_number: quantity("blockNumber")?,
        status: quantity("status")?.map(|s| s == 1),
    })
}
