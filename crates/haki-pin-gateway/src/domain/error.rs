//! Gateway error types and their HTTP mapping.
//!
//! | Error | Status | Body |
//! |-------|--------|------|
//! | `MissingIdentifier` | 400 | `{error:"missing lsk, ngoId, or donorId"}` |
//! | `CredentialsNotConfigured` | 500 | `{error:"Pinata credentials not configured"}` |
//! | `Rejected` | remote status | `{error:"pinata failed", details}` |
//! | `Internal` | 500 | `{error:"internal"}` |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use super::config::ConfigError;

/// Failure of one pin request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinGatewayError {
    #[error("missing lsk, ngoId, or donorId")]
    MissingIdentifier,

    #[error("Pinata credentials not configured")]
    CredentialsNotConfigured,

    /// The remote service answered with a non-success status.
    #[error("pinata failed")]
    Rejected { status: u16, details: String },

    /// Malformed body, transport failure or unreadable remote response.
    /// The cause is logged, never returned to the caller.
    #[error("internal")]
    Internal(String),
}

impl PinGatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingIdentifier => StatusCode::BAD_REQUEST,
            Self::CredentialsNotConfigured | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Rejected { details, .. } => json!({ "error": self.to_string(), "details": details }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for PinGatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Errors starting or running the gateway server.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("pinning client error: {0}")]
    Client(String),

    #[error("gateway already started")]
    AlreadyStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PinGatewayError::MissingIdentifier.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PinGatewayError::CredentialsNotConfigured.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PinGatewayError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let rejected = PinGatewayError::Rejected {
            status: 401,
            details: "bad key".into(),
        };
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_rejection_body_carries_details() {
        let rejected = PinGatewayError::Rejected {
            status: 403,
            details: "quota".into(),
        };
        assert_eq!(rejected.body(), json!({ "error": "pinata failed", "details": "quota" }));
    }

    #[test]
    fn test_internal_body_hides_cause() {
        let body = PinGatewayError::Internal("connection refused".into()).body();
        assert_eq!(body, json!({ "error": "internal" }));
    }
}
