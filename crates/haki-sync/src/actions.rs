//! Write operations.
//!
//! Each one is gated on the session's roles before any RPC, then runs
//! submit → await confirmation → exactly one refresh. Concurrent writes
//! are not queued.

use std::sync::Arc;

use chrono::Utc;
use haki_session::{ContractResult, SessionContext, TxReceipt};
use haki_telemetry::metrics::CONTRACT_WRITES;
use haki_types::{
    keccak256, parse_units, Address, Amount, BountyId, HakiError, HakiResult, IdentityClaim,
    IdentityKind, RoleTag, TxHash, TOKEN_DECIMALS,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::ports::ContentPinner;
use crate::synchronizer::Synchronizer;

/// Roles allowed to approve or release milestones.
pub const MILESTONE_AUTHORITIES: &[RoleTag] = &[RoleTag::Admin, RoleTag::CaseSteward, RoleTag::Ngo];

/// Summary line of the proposal submitted with an application.
pub const PROPOSAL_SUMMARY: &str = "I accept this bounty";

/// Proposal document hashed into `applyForBounty`.
pub fn proposal_document(timestamp_ms: i64) -> Value {
    json!({ "summary": PROPOSAL_SUMMARY, "timestamp": timestamp_ms })
}

/// Keccak-256 of a document's compact JSON text.
pub fn document_hash(document: &Value) -> haki_types::Hash {
    keccak256(document.to_string().as_bytes())
}

/// User-triggered writes for one session.
pub struct BountyActions {
    context: SessionContext,
    sync: Arc<Synchronizer>,
    pinner: Arc<dyn ContentPinner>,
}

impl BountyActions {
    pub fn new(context: SessionContext, sync: Arc<Synchronizer>, pinner: Arc<dyn ContentPinner>) -> Self {
        Self {
            context,
            sync,
            pinner,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    fn account(&self) -> Address {
        self.context.address()
    }

    async fn confirm(
        &self,
        operation: &'static str,
        submitted: ContractResult<TxHash>,
    ) -> HakiResult<TxReceipt> {
        let result = match submitted {
            Ok(tx) => self.context.handles.confirmer.wait(tx).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(receipt) => {
                CONTRACT_WRITES.with_label_values(&[operation, "confirmed"]).inc();
                info!(operation, tx = ?receipt.tx_hash, block = receipt.block_number, "Transaction confirmed");
            }
            Err(e) => {
                CONTRACT_WRITES.with_label_values(&[operation, "failed"]).inc();
                warn!(operation, error = %e, "Transaction failed");
            }
        }
        Ok(result?)
    }

    /// The single refresh that follows a confirmed write. A failed listing
    /// does not undo the write, so it is only logged.
    async fn refresh_after(&self, operation: &'static str) {
        if let Err(e) = self.sync.refresh().await {
            warn!(operation, error = %e, "Refresh after write failed");
        }
    }

    #[instrument(skip(self))]
    pub async fn approve_milestone(&self, bounty: BountyId, index: u32) -> HakiResult<TxReceipt> {
        const OP: &str = "approve_milestone";
        self.context.require_any(OP, MILESTONE_AUTHORITIES)?;

        let submitted = self.context.handles.registry.approve_milestone(bounty, index).await;
        let receipt = self.confirm(OP, submitted).await?;
        self.refresh_after(OP).await;
        Ok(receipt)
    }

    #[instrument(skip(self))]
    pub async fn release_milestone_funds(&self, bounty: BountyId, index: u32) -> HakiResult<TxReceipt> {
        const OP: &str = "release_milestone_funds";
        self.context.require_any(OP, MILESTONE_AUTHORITIES)?;

        let submitted = self.context.handles.escrow.release(bounty, index).await;
        let receipt = self.confirm(OP, submitted).await?;
        self.refresh_after(OP).await;
        Ok(receipt)
    }

    /// Approve the escrow to pull `amount` tokens, then deposit them.
    #[instrument(skip(self))]
    pub async fn fund_bounty(&self, bounty: BountyId, amount: &str) -> HakiResult<TxReceipt> {
        const OP: &str = "fund_bounty";
        self.context.require_any(OP, &[RoleTag::Donor])?;
        let amount = parse_units(amount, TOKEN_DECIMALS)?;

        let handles = &self.context.handles;
        let approval = handles.token.approve(handles.addresses.escrow, amount).await;
        self.confirm("token_approve", approval).await?;

        let deposit = handles.escrow.deposit(bounty, self.account(), amount).await;
        let receipt = self.confirm(OP, deposit).await?;
        self.refresh_after(OP).await;
        Ok(receipt)
    }

    /// Create a bounty with one milestone per decimal amount.
    #[instrument(skip(self))]
    pub async fn create_bounty(&self, milestone_amounts: &[&str]) -> HakiResult<TxReceipt> {
        const OP: &str = "create_bounty";
        self.context.require_any(OP, &[RoleTag::Ngo])?;
        let amounts = milestone_amounts
            .iter()
            .map(|a| parse_units(a, TOKEN_DECIMALS))
            .collect::<Result<Vec<Amount>, _>>()?;

        let registry = &self.context.handles.registry;
        let identity = registry.get_ngo_identity(self.account()).await?;
        if !identity.is_registered() {
            return Err(HakiError::IdentityNotRegistered(RoleTag::Ngo));
        }

        let submitted = registry.create_bounty(&amounts).await;
        let receipt = self.confirm(OP, submitted).await?;
        self.refresh_after(OP).await;
        Ok(receipt)
    }

    /// Apply with the caller's registered lawyer identity.
    #[instrument(skip(self))]
    pub async fn apply_for_bounty(&self, bounty: BountyId) -> HakiResult<TxReceipt> {
        const OP: &str = "apply_for_bounty";
        self.context.require_any(OP, &[RoleTag::Lawyer])?;

        let registry = &self.context.handles.registry;
        let identity = registry.get_lawyer_identity(self.account()).await?;
        if !identity.is_registered() {
            return Err(HakiError::IdentityNotRegistered(RoleTag::Lawyer));
        }

        let proposal_hash = document_hash(&proposal_document(Utc::now().timestamp_millis()));
        let submitted = registry
            .apply_for_bounty(bounty, &identity.cid, proposal_hash)
            .await;
        let receipt = self.confirm(OP, submitted).await?;
        self.refresh_after(OP).await;
        Ok(receipt)
    }

    #[instrument(skip(self))]
    pub async fn set_escrow_address(&self, escrow: Address) -> HakiResult<TxReceipt> {
        const OP: &str = "set_escrow_address";
        self.context.require_any(OP, &[RoleTag::Admin])?;

        let submitted = self.context.handles.registry.set_escrow(escrow).await;
        let receipt = self.confirm(OP, submitted).await?;
        self.refresh_after(OP).await;
        Ok(receipt)
    }

    pub async fn register_donor(&self, donor_id: &str) -> HakiResult<TxReceipt> {
        self.register_identity(IdentityClaim::new(IdentityKind::Donor, donor_id)).await
    }

    pub async fn register_ngo(&self, ngo_id: &str) -> HakiResult<TxReceipt> {
        self.register_identity(IdentityClaim::new(IdentityKind::Ngo, ngo_id)).await
    }

    pub async fn register_lawyer(&self, lsk: &str) -> HakiResult<TxReceipt> {
        self.register_identity(IdentityClaim::new(IdentityKind::Lawyer, lsk)).await
    }

    /// Pin the claim, read the pinned document back, hash it and register
    /// the cid and hash on chain. Nothing is submitted unless the pin and
    /// the read-back both succeed.
    #[instrument(skip(self, claim), fields(kind = %claim.kind))]
    pub async fn register_identity(&self, claim: IdentityClaim) -> HakiResult<TxReceipt> {
        let operation = match claim.kind {
            IdentityKind::Lawyer => "register_lawyer",
            IdentityKind::Ngo => "register_ngo",
            IdentityKind::Donor => "register_donor",
        };
        if claim.value.is_empty() {
            return Err(HakiError::Pinning(format!("{} is empty", claim.kind.field())));
        }

        let cid = self.pinner.pin(&claim).await?;
        let document = self.pinner.fetch(&cid).await?;
        let payload_hash = document_hash(&document);

        let registry = &self.context.handles.registry;
        let submitted = match claim.kind {
            IdentityKind::Lawyer => registry.register_lawyer(&cid, payload_hash).await,
            IdentityKind::Ngo => registry.register_ngo(&cid, payload_hash).await,
            IdentityKind::Donor => registry.register_donor(&cid, payload_hash).await,
        };
        let receipt = self.confirm(operation, submitted).await?;
        self.refresh_after(operation).await;
        Ok(receipt)
    }

    /// Token balance of the connected account.
    pub async fn token_balance(&self) -> HakiResult<Amount> {
        Ok(self.context.handles.token.balance_of(self.account()).await?)
    }
}
