//! # Haki Session
//!
//! Wallet session handshake for the bounty dashboards.
//!
//! ## Connect sequence
//!
//! ```text
//! request accounts ──▶ read chain id ──▶ [switch | add ▶ switch] ──▶ verify
//!        │                                                         │
//!   UserRejected                                           NetworkMismatch
//!                                                                  │
//!                          bind registry/escrow/token ◀────────────┘
//!                                     │
//!                       check 5 roles concurrently ──▶ SessionContext
//! ```
//!
//! The resulting [`SessionContext`] is passed explicitly to the state
//! synchronizer; there are no process-wide contract handles.
//!
//! ## Architecture
//!
//! - `domain/`: session, lifecycle events, configuration
//! - `ports/`: wallet provider and contract collaborator traits
//! - `adapters/`: JSON-RPC wallet and contracts, in-memory wallet and
//!   in-memory chain
//! - [`SessionManager`]: connect, change hooks, teardown

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod network;
pub mod ports;
pub mod roles;
pub mod service;

pub use domain::{
    ConfigError, ContractAddresses, Session, SessionConfig, SessionContext, SessionEvent,
};
pub use network::ensure_network;
pub use ports::{
    ContractConnector, ContractEvent, ContractHandles, ContractResult, ContractTopic, Escrow,
    EventSource, Listener, ListenerId, Registry, Token, TxConfirmer, TxReceipt, WalletError,
    WalletEvent, WalletProvider,
};
pub use roles::resolve_roles;
pub use service::{SessionManager, WalletWatch};
