//! Remote JSON pinning port.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Credentials, PinGatewayError};

/// Pins a JSON document and returns its content id.
#[async_trait]
pub trait PinningService: Send + Sync {
    async fn pin_json(
        &self,
        document: &Value,
        credentials: &Credentials,
    ) -> Result<String, PinGatewayError>;
}
