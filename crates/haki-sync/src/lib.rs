//! # Haki Sync
//!
//! Keeps a local mirror of on-chain bounty state for the role dashboards.
//!
//! ## Refresh
//!
//! ```text
//! getAllBounties ──▶ scope filter ──▶ per bounty, concurrently:
//!                                       ├─ milestones
//!                                       ├─ applications
//!                                       ├─ escrow balance
//!                                       └─ donors ──▶ contributions
//!                                                  │
//!                                       Snapshot ◀─┘
//! ```
//!
//! A failed listing fails the refresh. A failed sub-read leaves that
//! sub-collection empty and is logged.
//!
//! ## Writes
//!
//! [`BountyActions`] gates each write on the session's roles, submits it,
//! waits for confirmation and triggers exactly one refresh. Identity
//! registration pins the claim first and aborts before any transaction if
//! pinning fails.
//!
//! ## Change notifications
//!
//! [`Synchronizer::subscribe`] installs one listener per registry and
//! escrow topic. Dropping or unsubscribing the returned [`Subscription`]
//! removes exactly those listeners.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod actions;
pub mod adapters;
pub mod domain;
pub mod ports;
pub mod refresh;
pub mod subscription;
pub mod synchronizer;

pub use actions::{document_hash, proposal_document, BountyActions, MILESTONE_AUTHORITIES};
pub use domain::{
    BountyView, ContributionScope, Dashboard, MilestoneRegression, PinningConfig, RefreshPlan,
    Scope, Snapshot,
};
pub use ports::ContentPinner;
pub use refresh::refresh;
pub use subscription::{subscribe, Subscription};
pub use synchronizer::Synchronizer;
