//! Pin proxy and gateway port.

use async_trait::async_trait;
use haki_types::{HakiResult, IdentityClaim};
use serde_json::Value;

/// Pins identity documents and reads them back.
#[async_trait]
pub trait ContentPinner: Send + Sync {
    /// Pin `claim` through the proxy, returning the content id.
    async fn pin(&self, claim: &IdentityClaim) -> HakiResult<String>;

    /// Fetch the pinned JSON document for `cid` from the gateway.
    async fn fetch(&self, cid: &str) -> HakiResult<Value>;
}
