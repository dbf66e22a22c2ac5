//! # Core Domain Entities
//!
//! Entities as read from the registry and escrow contracts. Nothing here is
//! persisted; the synchronizer rebuilds them on every refresh.
//!
//! ## Clusters
//!
//! - **Bounties**: `Bounty`, `Milestone`, `MilestoneState`
//! - **Funding**: `Contribution`
//! - **Lawyers & identities**: `Application`, `IdentityRecord`

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::amount::Amount;

// Re-export the fixed-size hashes from primitive-types for use across crates
pub use primitive_types::{H160, H256, U256};

/// A 20-byte account identifier.
pub type Address = H160;

/// A 32-byte Keccak-256 digest.
pub type Hash = H256;

/// Hash of a submitted transaction.
pub type TxHash = H256;

/// Keccak-256 over raw bytes, as used for identity payload and proposal hashes.
pub fn keccak256(bytes: &[u8]) -> Hash {
    H256::from_slice(&Keccak256::digest(bytes))
}

/// Parse a `0x`-prefixed (or bare) 40-digit hex account id.
///
/// Case-insensitive; checksum casing is accepted but not verified.
pub fn parse_address(text: &str) -> Option<Address> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.len() != 40 {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    Some(H160::from_slice(&bytes))
}

/// Contract-assigned bounty identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BountyId(pub u64);

impl fmt::Display for BountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BountyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A funded task unit created by an NGO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: BountyId,
    /// NGO that created the bounty.
    pub ngo: Address,
    pub active: bool,
    pub lawyer_selected: bool,
    /// `None` while no lawyer has been assigned (zero address on-chain).
    pub assigned_lawyer: Option<Address>,
}

impl Bounty {
    /// True if `who` created this bounty.
    pub fn is_owned_by(&self, who: &Address) -> bool {
        self.ngo == *who
    }

    /// True if `who` is the assigned lawyer.
    pub fn is_assigned_to(&self, who: &Address) -> bool {
        self.assigned_lawyer.as_ref() == Some(who)
    }
}

/// Observed lifecycle of a milestone.
///
/// Variants are declared in progression order so `Ord` matches the only
/// permitted direction: `Unapproved -> Approved -> Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MilestoneState {
    Unapproved,
    Approved,
    Released,
}

impl MilestoneState {
    /// Whether an observation of `next` after `self` is a legal transition.
    ///
    /// Staying in place is legal; going backwards never is.
    pub fn can_transition_to(self, next: MilestoneState) -> bool {
        next >= self
    }
}

impl fmt::Display for MilestoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unapproved => "unapproved",
            Self::Approved => "approved",
            Self::Released => "released",
        };
        f.write_str(s)
    }
}

/// A sub-unit of a bounty carrying a token amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub bounty_id: BountyId,
    /// Zero-based, stable ordinal within the bounty.
    pub index: u32,
    /// Token quantity in base units (18 decimals).
    pub amount: Amount,
    pub approved: bool,
    pub released: bool,
}

impl Milestone {
    /// Lifecycle state derived from the two flags.
    pub fn state(&self) -> MilestoneState {
        if self.released {
            MilestoneState::Released
        } else if self.approved {
            MilestoneState::Approved
        } else {
            MilestoneState::Unapproved
        }
    }

    /// `released` implies `approved`.
    pub fn is_consistent(&self) -> bool {
        !self.released || self.approved
    }
}

/// A donor's total contribution to one bounty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub bounty_id: BountyId,
    pub donor: Address,
    pub amount: Amount,
}

/// A lawyer's application to work on a bounty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub bounty_id: BountyId,
    pub lawyer: Address,
    /// Content reference of the lawyer's pinned identity/proposal.
    pub proposal_uri: String,
    pub accepted: bool,
}

/// An identity registered through `registerNGO` / `registerLawyer` / `registerDonor`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub cid: String,
    pub payload_hash: Hash,
}

impl IdentityRecord {
    /// An identity counts as registered once both the cid and hash are set.
    pub fn is_registered(&self) -> bool {
        !self.cid.is_empty() && !self.payload_hash.is_zero()
    }
}
