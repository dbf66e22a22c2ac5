//! # Haki Types Crate
//!
//! Domain entities, role tags, chain identifiers, token amount helpers and the
//! error taxonomy shared by the session manager, the state synchronizer and
//! the pin gateway.
//!
//! ## Design Principles
//!
//! - **Mirror, never decide**: roles, escrow balances and milestone flags are
//!   authoritative on-chain. These types only carry what was read.
//! - **One canonical comparison**: chain ids are `u64` newtypes and addresses
//!   are byte arrays, so equality never depends on string casing or numeric
//!   representation.
//! - **One error taxonomy**: every user-triggered failure is a [`HakiError`]
//!   and reaches the presentation layer through [`Notification`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod amount;
pub mod chain;
pub mod entities;
pub mod errors;
pub mod identity;
pub mod roles;

pub use amount::{format_units, parse_units, Amount, TOKEN_DECIMALS};
pub use chain::{ChainId, NativeCurrency, NetworkParams};
pub use entities::*;
pub use errors::*;
pub use identity::{IdentityClaim, IdentityKind};
pub use roles::{RoleId, RoleSet, RoleTag};
