//! reqwest client for the pin proxy and the public gateway.

use async_trait::async_trait;
use haki_types::{HakiError, HakiResult, IdentityClaim};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::PinningConfig;
use crate::ports::ContentPinner;

#[derive(Deserialize)]
struct PinResponse {
    cid: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

/// Pins through `POST <pin_endpoint>` and verifies through the gateway.
pub struct HttpPinner {
    client: Client,
    config: PinningConfig,
}

impl HttpPinner {
    pub fn new(config: PinningConfig) -> HakiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| HakiError::Pinning(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PinningConfig {
        &self.config
    }
}

#[async_trait]
impl ContentPinner for HttpPinner {
    #[instrument(skip(self, claim), fields(kind = %claim.kind))]
    async fn pin(&self, claim: &IdentityClaim) -> HakiResult<String> {
        let response = self
            .client
            .post(&self.config.pin_endpoint)
            .json(&claim.request_body())
            .send()
            .await
            .map_err(|e| HakiError::Pinning(e.to_string()))?;

        let status = response.status();
        let body: PinResponse = response
            .json()
            .await
            .map_err(|e| HakiError::Pinning(format!("unreadable pin response ({}): {}", status, e)))?;

        if !status.is_success() {
            let reason = body.error.unwrap_or_else(|| status.to_string());
            return Err(HakiError::Pinning(match body.details {
                Some(details) => format!("{}: {}", reason, details),
                None => reason,
            }));
        }

        let cid = body
            .cid
            .filter(|cid| !cid.is_empty())
            .ok_or_else(|| HakiError::Pinning("pin response carried no cid".into()))?;
        debug!(cid = %cid, "Identity pinned");
        Ok(cid)
    }

    async fn fetch(&self, cid: &str) -> HakiResult<Value> {
        let url = self.config.document_url(cid);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HakiError::Pinning(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HakiError::Pinning(format!(
                "gateway returned {} for {}",
                response.status(),
                cid
            )));
        }

        response
            .json()
            .await
            .map_err(|e| HakiError::Pinning(format!("pinned document is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use haki_types::IdentityKind;
    use serde_json::json;

    async fn pin(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body.get("lsk").is_some() {
            (StatusCode::OK, Json(json!({ "cid": "bafylawyer" })))
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "pinata failed", "details": "invalid key" })),
            )
        }
    }

    async fn document(Path(cid): Path<String>) -> Json<Value> {
        Json(json!({ "type": "lawyer", "cid": cid }))
    }

    async fn spawn() -> PinningConfig {
        let app = Router::new()
            .route("/api/pin-lsk", post(pin))
            .route("/ipfs/:cid", get(document));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        PinningConfig {
            pin_endpoint: format!("http://{}/api/pin-lsk", addr),
            gateway_url: format!("http://{}/ipfs", addr),
            ..PinningConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pin_then_fetch() {
        let pinner = HttpPinner::new(spawn().await).unwrap();
        let cid = pinner
            .pin(&IdentityClaim::new(IdentityKind::Lawyer, "LSK-1"))
            .await
            .unwrap();
        assert_eq!(cid, "bafylawyer");

        let doc = pinner.fetch(&cid).await.unwrap();
        assert_eq!(doc["cid"], "bafylawyer");
    }

    #[tokio::test]
    async fn test_rejected_pin_carries_details() {
        let pinner = HttpPinner::new(spawn().await).unwrap();
        let err = pinner
            .pin(&IdentityClaim::new(IdentityKind::Donor, "D-1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HakiError::Pinning("pinata failed: invalid key".into())
        );
    }
}
