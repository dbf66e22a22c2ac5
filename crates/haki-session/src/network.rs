//! Chain-id enforcement.
//!
//! Exactly one remediation is attempted: a switch, or, when the wallet does
//! not know the network, an add followed by a switch. Anything else is
//! terminal.

use std::future::Future;

use haki_telemetry::metrics::WALLET_RPC_CALLS;
use haki_types::{ChainId, HakiError, HakiResult, NetworkParams};
use tracing::{debug, info, warn};

use crate::ports::{codes, WalletError, WalletProvider};

pub(crate) const METHOD_CHAIN_ID: &str = "eth_chainId";
pub(crate) const METHOD_SWITCH: &str = "wallet_switchEthereumChain";
pub(crate) const METHOD_ADD: &str = "wallet_addEthereumChain";
pub(crate) const METHOD_ACCOUNTS: &str = "eth_requestAccounts";

/// Count one wallet RPC by method and outcome.
pub(crate) async fn observe<T, F>(method: &'static str, call: F) -> Result<T, WalletError>
where
    F: Future<Output = Result<T, WalletError>>,
{
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    WALLET_RPC_CALLS.with_label_values(&[method, outcome]).inc();
    result
}

fn is_unrecognized(err: &WalletError) -> bool {
    matches!(
        err,
        WalletError::UnrecognizedChain(_)
            | WalletError::Rpc {
                code: codes::UNRECOGNIZED_CHAIN,
                ..
            }
    )
}

/// Make sure the wallet is on `target`, returning the verified chain id.
pub async fn ensure_network(
    wallet: &dyn WalletProvider,
    target: &NetworkParams,
) -> HakiResult<ChainId> {
    let current = observe(METHOD_CHAIN_ID, wallet.chain_id()).await?;
    if current == target.chain_id {
        debug!(chain = %current, "Wallet already on target network");
        return Ok(current);
    }

    info!(current = %current, target = %target.chain_id, "Switching wallet network");

    match observe(METHOD_SWITCH, wallet.switch_chain(target.chain_id)).await {
        Ok(()) => {}
        Err(err) if is_unrecognized(&err) => {
            info!(chain = %target.chain_id, name = %target.chain_name, "Network unknown to wallet, adding it");
            observe(METHOD_ADD, wallet.add_chain(target)).await?;
            observe(METHOD_SWITCH, wallet.switch_chain(target.chain_id)).await?;
        }
        Err(err) => return Err(err.into()),
    }

    let actual = observe(METHOD_CHAIN_ID, wallet.chain_id()).await?;
    if actual != target.chain_id {
        warn!(expected = %target.chain_id, actual = %actual, "Wallet still on wrong network");
        return Err(HakiError::NetworkMismatch {
            expected: target.chain_id,
            actual,
        });
    }

    Ok(actual)
}
