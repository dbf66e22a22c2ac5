//! # Haki Test Suite
//!
//! Cross-crate flows that exercise the session manager, the state
//! synchronizer and the pin gateway together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs        # shared fixtures and collaborator wrappers
//!     ├── session_flows.rs  # connect, network enforcement, role gating
//!     ├── sync_flows.rs     # refresh, subscriptions, publication order
//!     ├── gateway_flows.rs  # pin endpoint over real HTTP
//!     └── registration.rs   # pin → verify → register → apply
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p haki-tests
//! cargo test -p haki-tests integration::sync_flows
//! ```

pub mod integration;
