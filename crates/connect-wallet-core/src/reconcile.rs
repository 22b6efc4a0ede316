//! Network reconciliation: make the wallet's active chain match the requested one.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::chains::chain_id_from_json;
use crate::domain::NetworkRequest;
use crate::errors::WalletError;
use crate::ports::{WalletProvider, UNRECOGNIZED_CHAIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    AlreadyActive,
    Switched,
    Added,
    /// The wallet does not know the chain and no add-chain data was supplied; the
    /// connection proceeds on whatever chain the wallet is on.
    SkippedUnknownChain,
}

pub async fn check_net(
    provider: &dyn WalletProvider,
    network: &NetworkRequest,
) -> Result<Reconciliation, WalletError> {
    let current = provider
        .request("eth_chainId", json!([]))
        .await
        .map_err(WalletError::reconcile_failed)?;
    let current = chain_id_from_json(&current).map_err(WalletError::reconcile_failed)?;
    if current == network.chain_id {
        return Ok(Reconciliation::AlreadyActive);
    }

    debug!(
        from = current,
        to = network.chain_id,
        "requesting wallet chain switch"
    );
    let switch = provider
        .request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": network.wire_chain_id() }]),
        )
        .await;
    let err = match switch {
        Ok(_) => {
            info!(chain_id = network.chain_id, "wallet switched chain");
            return Ok(Reconciliation::Switched);
        }
        Err(err) => err,
    };

    if err.rpc_code() != Some(UNRECOGNIZED_CHAIN) {
        if err.is_user_rejection() {
            info!(chain_id = network.chain_id, "user declined the chain switch");
        } else {
            warn!(error = %err, "chain switch refused");
        }
        return Err(WalletError::user_rejected_switch());
    }

    let Some(params) = network.add_chain_params() else {
        warn!(
            chain_id = network.chain_id,
            "wallet does not know the chain and no add-chain data was given; continuing"
        );
        return Ok(Reconciliation::SkippedUnknownChain);
    };

    match provider
        .request("wallet_addEthereumChain", json!([params]))
        .await
    {
        Ok(_) => {
            info!(chain_id = network.chain_id, "wallet added chain");
            Ok(Reconciliation::Added)
        }
        Err(err) => {
            warn!(error = %err, "add chain refused");
            Err(WalletError::user_rejected_add())
        }
    }
}
