//! In-memory pinning service.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::domain::{Credentials, PinGatewayError};
use crate::ports::PinningService;

/// Records every pinned document; content ids are sequential.
#[derive(Default)]
pub struct InMemoryPinService {
    pinned: Mutex<Vec<(Value, Credentials)>>,
    rejection: Mutex<Option<(u16, String)>>,
}

impl InMemoryPinService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer subsequent pins with `status` and `details`.
    pub fn reject_with(&self, status: u16, details: impl Into<String>) {
        *self.rejection.lock() = Some((status, details.into()));
    }

    /// Documents pinned so far, oldest first.
    pub fn documents(&self) -> Vec<Value> {
        self.pinned.lock().iter().map(|(doc, _)| doc.clone()).collect()
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.pinned.lock().last().map(|(_, creds)| creds.clone())
    }
}

#[async_trait]
impl PinningService for InMemoryPinService {
    async fn pin_json(
        &self,
        document: &Value,
        credentials: &Credentials,
    ) -> Result<String, PinGatewayError> {
        if let Some((status, details)) = self.rejection.lock().clone() {
            return Err(PinGatewayError::Rejected { status, details });
        }
        let mut pinned = self.pinned.lock();
        pinned.push((document.clone(), credentials.clone()));
        Ok(format!("QmMemory{}", pinned.len()))
    }
}
