//! # Adapters Layer
//!
//! Pinning collaborators.

mod http_pinner;
mod memory_pinner;

pub use http_pinner::HttpPinner;
pub use memory_pinner::InMemoryPinner;
