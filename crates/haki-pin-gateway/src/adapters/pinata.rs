//! Pinata `pinJSONToIPFS` client.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::domain::{Credentials, PinGatewayError, PinataConfig};
use crate::ports::PinningService;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: Option<String>,
}

pub struct PinataClient {
    client: Client,
    url: String,
}

impl PinataClient {
    pub fn new(config: &PinataConfig) -> Result<Self, PinGatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PinGatewayError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn authorize(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match credentials {
        Credentials::Bearer(jwt) => request.header(AUTHORIZATION, format!("Bearer {}", jwt)),
        Credentials::KeyPair { api_key, secret } => request
            .header("pinata_api_key", api_key)
            .header("pinata_secret_api_key", secret),
    }
}

#[async_trait]
impl PinningService for PinataClient {
    #[instrument(skip_all, fields(auth = credentials.mode()))]
    async fn pin_json(
        &self,
        document: &Value,
        credentials: &Credentials,
    ) -> Result<String, PinGatewayError> {
        let response = authorize(self.client.post(&self.url), credentials)
            .json(document)
            .send()
            .await
            .map_err(|e| PinGatewayError::Internal(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), details = %details, "Pinata rejected payload");
            return Err(PinGatewayError::Rejected {
                status: status.as_u16(),
                details,
            });
        }

        let body: PinResponse = response
            .json()
            .await
            .map_err(|e| PinGatewayError::Internal(format!("unreadable Pinata response: {}", e)))?;
        let cid = body
            .ipfs_hash
            .ok_or_else(|| PinGatewayError::Internal("Pinata response carried no IpfsHash".into()))?;
        debug!(cid = %cid, "Document pinned");
        Ok(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct Seen {
        headers: Mutex<Vec<HeaderMap>>,
        bodies: Mutex<Vec<Value>>,
    }

    async fn spawn(seen: Arc<Seen>) -> PinataConfig {
        let app = Router::new().route(
            "/pinning/pinJSONToIPFS",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = Arc::clone(&seen);
                async move {
                    let over_quota = body.get("quota").is_some();
                    seen.headers.lock().push(headers);
                    seen.bodies.lock().push(body);
                    let response: Response = if over_quota {
                        (StatusCode::FORBIDDEN, "PAYMENT_REQUIRED: quota exceeded").into_response()
                    } else {
                        Json(json!({ "IpfsHash": "QmPinned", "PinSize": 120 })).into_response()
                    };
                    response
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        PinataConfig {
            url: format!("http://{}/pinning/pinJSONToIPFS", addr),
            ..PinataConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bearer_header() {
        let seen = Arc::new(Seen::default());
        let client = PinataClient::new(&spawn(Arc::clone(&seen)).await).unwrap();
        let doc = json!({ "type": "donor", "donorId": "D1" });

        let cid = client
            .pin_json(&doc, &Credentials::Bearer("token".into()))
            .await
            .unwrap();
        assert_eq!(cid, "QmPinned");
        assert_eq!(seen.headers.lock()[0]["authorization"], "Bearer token");
        assert_eq!(seen.bodies.lock()[0], doc);
    }

    #[tokio::test]
    async fn test_key_pair_headers() {
        let seen = Arc::new(Seen::default());
        let client = PinataClient::new(&spawn(Arc::clone(&seen)).await).unwrap();
        let creds = Credentials::KeyPair {
            api_key: "key".into(),
            secret: "secret".into(),
        };

        client.pin_json(&json!({}), &creds).await.unwrap();
        let headers = seen.headers.lock();
        assert_eq!(headers[0]["pinata_api_key"], "key");
        assert_eq!(headers[0]["pinata_secret_api_key"], "secret");
        assert!(!headers[0].contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_rejection_passes_status_and_text() {
        let client = PinataClient::new(&spawn(Arc::default()).await).unwrap();
        let err = client
            .pin_json(&json!({ "quota": true }), &Credentials::Bearer("token".into()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PinGatewayError::Rejected {
                status: 403,
                details: "PAYMENT_REQUIRED: quota exceeded".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_internal() {
        let config = PinataConfig {
            url: "http://127.0.0.1:1/pinning/pinJSONToIPFS".into(),
            ..PinataConfig::default()
        };
        let client = PinataClient::new(&config).unwrap();
        assert!(matches!(
            client.pin_json(&json!({}), &Credentials::Bearer("t".into())).await,
            Err(PinGatewayError::Internal(_))
        ));
    }
}
