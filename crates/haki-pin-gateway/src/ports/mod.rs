//! # Ports Layer
//!
//! Outbound dependency of the gateway: the remote JSON pinning service.

pub mod pinning;

pub use pinning::PinningService;
