//! Pin endpoint over real HTTP.

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use haki_pin_gateway::{Credentials, GatewayConfig, InMemoryPinService, PinGatewayService};
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    async fn start(credentials: Option<Credentials>) -> (PinGatewayService, Arc<InMemoryPinService>, String) {
        let mut config = GatewayConfig::default();
        config.http.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.http.port = 0;
        config.pinata.credentials = credentials;

        let pinner = Arc::new(InMemoryPinService::new());
        let mut service = PinGatewayService::new(config, pinner.clone()).unwrap();
        let addr = service.start().await.unwrap();
        (service, pinner, format!("http://{}/api/pin-lsk", addr))
    }

    async fn post(url: &str, body: Value) -> (StatusCode, Value) {
        let response = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_each_identity_kind_is_pinned() {
        let (mut service, pinner, url) = start(Some(Credentials::Bearer("jwt".into()))).await;

        for (body, kind) in [
            (json!({ "lsk": "LSK-1" }), "lawyer"),
            (json!({ "ngoId": "NGO-1" }), "ngo"),
            (json!({ "donorId": "DON-1" }), "donor"),
        ] {
            let (status, reply) = post(&url, body).await;
            assert_eq!(status, StatusCode::OK);
            assert!(reply["cid"].as_str().unwrap().starts_with("QmMemory"));
            assert_eq!(pinner.documents().last().unwrap()["type"], kind);
        }
        assert_eq!(pinner.last_credentials(), Some(Credentials::Bearer("jwt".into())));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_contract() {
        let (mut service, pinner, url) = start(Some(Credentials::KeyPair {
            api_key: "key".into(),
            secret: "secret".into(),
        }))
        .await;

        let (status, reply) = post(&url, json!({ "name": "nobody" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "missing lsk, ngoId, or donorId");

        pinner.reject_with(402, "PAYMENT_REQUIRED");
        let (status, reply) = post(&url, json!({ "lsk": "LSK-2" })).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(reply, json!({ "error": "pinata failed", "details": "PAYMENT_REQUIRED" }));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_unconfigured_credentials() {
        let (mut service, pinner, url) = start(None).await;
        let (status, reply) = post(&url, json!({ "donorId": "DON-2" })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply, json!({ "error": "Pinata credentials not configured" }));
        assert!(pinner.documents().is_empty());
        service.shutdown().await;
    }
}
