//! In-memory pinning service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use haki_types::{keccak256, HakiError, HakiResult, IdentityClaim};
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::ports::ContentPinner;

/// Stores pinned documents in a map; content ids derive from the document.
#[derive(Default)]
pub struct InMemoryPinner {
    documents: RwLock<HashMap<String, Value>>,
    pins: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryPinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent pins fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Pin attempts received, failed ones included.
    pub fn pin_count(&self) -> usize {
        self.pins.load(Ordering::SeqCst)
    }

    pub fn document(&self, cid: &str) -> Option<Value> {
        self.documents.read().get(cid).cloned()
    }
}

#[async_trait]
impl ContentPinner for InMemoryPinner {
    async fn pin(&self, claim: &IdentityClaim) -> HakiResult<String> {
        self.pins.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(HakiError::Pinning("pinning service unavailable".into()));
        }

        let kind = claim.kind;
        let mut document = json!({
            "type": kind.type_tag(),
            "name": kind.display_name(),
            "description": kind.description(),
        });
        document[kind.field()] = Value::String(claim.value.clone());

        let digest = keccak256(document.to_string().as_bytes());
        let cid = format!("bafy{}", hex_prefix(digest.as_bytes()));
        self.documents.write().insert(cid.clone(), document);
        Ok(cid)
    }

    async fn fetch(&self, cid: &str) -> HakiResult<Value> {
        self.document(cid)
            .ok_or_else(|| HakiError::Pinning(format!("{} not found on gateway", cid)))
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(16).map(|b| format!("{:02x}", b)).collect()
}
