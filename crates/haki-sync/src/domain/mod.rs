//! # Domain Layer
//!
//! Snapshot model, refresh plans and pinning configuration.

pub mod config;
pub mod plan;
pub mod snapshot;

pub use config::PinningConfig;
pub use plan::{ContributionScope, Dashboard, RefreshPlan, Scope};
pub use snapshot::{BountyView, MilestoneRegression, Snapshot};
