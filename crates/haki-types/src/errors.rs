//! # Error Types
//!
//! One taxonomy for every failure a user action can hit, plus the single
//! adapter that turns it into something the presentation layer can show.
//!
//! | Class | Variant | Policy |
//! |-------|---------|--------|
//! | provider missing | `NoWalletProvider` | fatal, surfaced immediately |
//! | user rejected | `UserRejected` | abandon, no retry |
//! | network mismatch | `NetworkMismatch` | one switch / add+switch, then fatal |
//! | contract failure | `Contract` | surfaced verbatim, no retry |
//! | pinning failure | `Pinning` | surfaced, on-chain step never attempted |
//!
//! Partial read failures during a refresh never reach this type; the
//! synchronizer absorbs them into empty sub-collections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ChainId;
use crate::roles::RoleTag;

/// Failure of a call against one of the contract collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The transaction or call reverted.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// Transport or node-side RPC failure.
    #[error("contract RPC failed: {0}")]
    Rpc(String),

    /// The response could not be decoded into the expected shape.
    #[error("unexpected contract response: {0}")]
    Decode(String),
}

/// Decimal text could not be turned into a token amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("invalid amount: {0:?}")]
    Invalid(String),

    #[error("amount {value:?} has more than {decimals} decimals")]
    TooManyDecimals { value: String, decimals: usize },

    #[error("amount {0:?} does not fit in 256 bits")]
    Overflow(String),
}

/// A chain id string was neither hex nor decimal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid chain id: {0:?}")]
pub struct ChainIdParseError(pub String);

/// Every failure a user-triggered operation can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HakiError {
    /// No wallet extension/provider is available.
    #[error("no wallet provider found")]
    NoWalletProvider,

    /// The user declined the wallet prompt.
    #[error("request rejected by user")]
    UserRejected,

    /// The wallet stayed on the wrong network after remediation.
    #[error("wrong network: expected chain {expected}, wallet is on {actual}")]
    NetworkMismatch { expected: ChainId, actual: ChainId },

    /// Any other wallet RPC failure.
    #[error("wallet error {code}: {message}")]
    Wallet { code: i64, message: String },

    /// Contract call or transaction failure.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Pinning proxy or gateway verification failed.
    #[error("pinning failed: {0}")]
    Pinning(String),

    /// The session lacks every role that may perform the operation.
    #[error("{operation} requires one of {required:?}")]
    MissingRole {
        operation: &'static str,
        required: Vec<RoleTag>,
    },

    /// The caller has no registered identity of the needed kind.
    #[error("{0} identity not registered")]
    IdentityNotRegistered(RoleTag),

    /// No active session.
    #[error("wallet not connected")]
    NotConnected,

    /// User-entered amount could not be parsed.
    #[error(transparent)]
    InvalidAmount(#[from] AmountParseError),
}

impl HakiError {
    /// Short stable label, used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoWalletProvider => "no_wallet_provider",
            Self::UserRejected => "user_rejected",
            Self::NetworkMismatch { .. } => "network_mismatch",
            Self::Wallet { .. } => "wallet",
            Self::Contract(_) => "contract",
            Self::Pinning(_) => "pinning",
            Self::MissingRole { .. } => "missing_role",
            Self::IdentityNotRegistered(_) => "identity_not_registered",
            Self::NotConnected => "not_connected",
            Self::InvalidAmount(_) => "invalid_amount",
        }
    }
}

/// Result type for user-triggered operations.
pub type HakiResult<T> = Result<T, HakiError>;

/// How prominent a notification should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A user-visible message produced at the boundary of a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    /// The one place a [`HakiError`] becomes user-facing text.
    pub fn from_error(error: &HakiError) -> Self {
        let (severity, message) = match error {
            HakiError::NoWalletProvider => (
                Severity::Error,
                "No wallet found. Please install a browser wallet.".to_string(),
            ),
            HakiError::UserRejected => (
                Severity::Warning,
                "Request cancelled in wallet.".to_string(),
            ),
            HakiError::NetworkMismatch { expected, .. } => (
                Severity::Error,
                format!("Please switch your wallet to chain {}.", expected),
            ),
            HakiError::MissingRole { operation, required } => {
                let names: Vec<&str> = required.iter().map(|r| r.contract_name()).collect();
                (
                    Severity::Warning,
                    format!("{} requires role {}.", operation, names.join(" or ")),
                )
            }
            HakiError::IdentityNotRegistered(role) => (
                Severity::Warning,
                format!("{} identity not found. Register first.", role),
            ),
            HakiError::NotConnected => (Severity::Warning, "Connect wallet first.".to_string()),
            HakiError::InvalidAmount(e) => (Severity::Warning, e.to_string()),
            other => (Severity::Error, other.to_string()),
        };
        Self { severity, message }
    }
}

impl From<&HakiError> for Notification {
    fn from(error: &HakiError) -> Self {
        Notification::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_is_surfaced_verbatim() {
        let err = HakiError::from(ContractError::Reverted("milestone already approved".into()));
        let note = Notification::from_error(&err);
        assert_eq!(note.severity, Severity::Error);
        assert!(note.message.contains("milestone already approved"));
    }

    #[test]
    fn test_network_mismatch_message_names_target() {
        let err = HakiError::NetworkMismatch {
            expected: ChainId::SEPOLIA,
            actual: ChainId(1),
        };
        assert!(Notification::from(&err).message.contains("11155111"));
        assert_eq!(err.kind(), "network_mismatch");
    }

    #[test]
    fn test_missing_role_lists_alternatives() {
        let err = HakiError::MissingRole {
            operation: "approve milestone",
            required: vec![RoleTag::Admin, RoleTag::Ngo],
        };
        let note = Notification::from_error(&err);
        assert_eq!(note.severity, Severity::Warning);
        assert!(note.message.contains("ADMIN_ROLE or NGO_ROLE"));
    }

    #[test]
    fn test_user_rejection_is_a_warning() {
        assert_eq!(
            Notification::from_error(&HakiError::UserRejected).severity,
            Severity::Warning
        );
    }
}
