//! # Domain Layer
//!
//! Session state, lifecycle events and configuration. No I/O.

pub mod config;
pub mod events;
pub mod session;

pub use config::{ConfigError, ContractAddresses, SessionConfig};
pub use events::SessionEvent;
pub use session::{Session, SessionContext};
