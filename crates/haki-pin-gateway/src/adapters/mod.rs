//! # Adapters Layer
//!
//! Pinata HTTP client and an in-memory pinning service.

mod memory;
mod pinata;

pub use memory::InMemoryPinService;
pub use pinata::PinataClient;
