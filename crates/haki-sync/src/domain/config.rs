//! Endpoints used by the identity registration flow.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default public gateway for reading pinned documents back.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud/ipfs";

/// Default location of the pin proxy route.
pub const DEFAULT_PIN_ENDPOINT: &str = "http://127.0.0.1:3000/api/pin-lsk";

/// Pinning and gateway endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinningConfig {
    /// `POST` target taking `{lsk|ngoId|donorId}` and returning `{cid}`.
    pub pin_endpoint: String,
    /// Base URL; documents are fetched from `<gateway_url>/<cid>`.
    pub gateway_url: String,
    pub request_timeout: Duration,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            pin_endpoint: DEFAULT_PIN_ENDPOINT.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl PinningConfig {
    /// `HAKI_PIN_ENDPOINT`, `HAKI_GATEWAY_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = env::var("HAKI_PIN_ENDPOINT") {
            config.pin_endpoint = endpoint;
        }
        if let Ok(gateway) = env::var("HAKI_GATEWAY_URL") {
            config.gateway_url = gateway;
        }
        config
    }

    /// Gateway URL of a pinned document.
    pub fn document_url(&self, cid: &str) -> String {
        format!("{}/{}", self.gateway_url.trim_end_matches('/'), cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url_joins_once() {
        let mut config = PinningConfig::default();
        assert_eq!(
            config.document_url("bafy123"),
            "https://gateway.pinata.cloud/ipfs/bafy123"
        );
        config.gateway_url = "http://localhost:8080/ipfs/".into();
        assert_eq!(config.document_url("Qm1"), "http://localhost:8080/ipfs/Qm1");
    }
}
