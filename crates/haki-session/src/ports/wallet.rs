//! Wallet provider port.
//!
//! The subset of the injected-wallet RPC surface the session needs:
//! account access, chain id, network switching/registration and change
//! notifications.

use async_trait::async_trait;
use haki_types::{Address, ChainId, HakiError, NetworkParams};
use thiserror::Error;
use tokio::sync::broadcast;

/// Wallet RPC error codes (EIP-1193 / MetaMask).
pub mod codes {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
}

/// Failure of a single wallet RPC.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("user rejected the request")]
    Rejected,

    #[error("chain {0} is not known to the wallet")]
    UnrecognizedChain(ChainId),

    #[error("wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

impl WalletError {
    /// Map a raw RPC error object onto the taxonomy.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        match code {
            codes::USER_REJECTED => Self::Rejected,
            _ => Self::Rpc {
                code,
                message: message.into(),
            },
        }
    }

    /// Metric label for this failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::UnrecognizedChain(_) => "unrecognized_chain",
            Self::Rpc { .. } => "error",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<WalletError> for HakiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => HakiError::UserRejected,
            WalletError::UnrecognizedChain(chain) => HakiError::Wallet {
                code: codes::UNRECOGNIZED_CHAIN,
                message: format!("chain {} is not known to the wallet", chain),
            },
            WalletError::Rpc { code, message } => HakiError::Wallet { code, message },
            WalletError::Unavailable(message) => HakiError::Wallet { code: -1, message },
        }
    }
}

/// Notification pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Active account list changed; empty means the wallet locked or
    /// revoked access.
    AccountsChanged(Vec<Address>),
    /// The wallet moved to another network.
    ChainChanged(ChainId),
}

/// Local wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`: prompts for access, returns the exposed accounts.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// `eth_chainId`.
    async fn chain_id(&self) -> Result<ChainId, WalletError>;

    /// `wallet_switchEthereumChain`. Fails with
    /// [`WalletError::UnrecognizedChain`] when the wallet lacks the network.
    async fn switch_chain(&self, chain: ChainId) -> Result<(), WalletError>;

    /// `wallet_addEthereumChain`.
    async fn add_chain(&self, params: &NetworkParams) -> Result<(), WalletError>;

    /// Stream of account/chain change notifications.
    fn events(&self) -> broadcast::Receiver<WalletEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_code_maps_to_user_rejected() {
        let err = WalletError::from_rpc(codes::USER_REJECTED, "User denied");
        assert_eq!(err, WalletError::Rejected);
        assert_eq!(HakiError::from(err), HakiError::UserRejected);
    }

    #[test]
    fn test_other_codes_stay_rpc_errors() {
        let err = WalletError::from_rpc(-32603, "internal");
        assert_eq!(err.outcome(), "error");
        assert!(matches!(
            HakiError::from(err),
            HakiError::Wallet { code: -32603, .. }
        ));
    }
}
