//! # Ports Layer
//!
//! Contract ports come from `haki-session`; the synchronizer adds the
//! pinning collaborator used by identity registration.

pub mod pinning;

pub use pinning::ContentPinner;
