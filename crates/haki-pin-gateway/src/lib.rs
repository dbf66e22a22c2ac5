//! # Haki Pin Gateway
//!
//! Server-side proxy between the dashboards and Pinata. The browser never
//! sees the pinning credentials.
//!
//! ## Request flow
//!
//! ```text
//! POST /api/pin-lsk {lsk | ngoId | donorId}
//!        │
//!        ├─ none present ───────────────▶ 400 {error}
//!        ▼
//!  {type, name, description, <field>, timestamp}
//!        │
//!        ├─ no credentials ─────────────▶ 500 {error}
//!        ▼
//!  pinJSONToIPFS (Bearer JWT | key pair)
//!        │
//!        ├─ rejected ───────────────────▶ <status> {error, details}
//!        ▼
//!  200 {cid}
//! ```
//!
//! ## Architecture
//!
//! - `domain/`: configuration, error mapping, identity document
//! - `ports/`: [`PinningService`]
//! - `adapters/`: Pinata client, in-memory service
//! - [`router`]: axum routes and middleware
//! - [`PinGatewayService`]: server lifecycle

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod router;
pub mod service;

pub use adapters::{InMemoryPinService, PinataClient};
pub use domain::{Credentials, GatewayConfig, PinGatewayError, PinPayload, ServiceError};
pub use ports::PinningService;
pub use router::{build_router, AppState};
pub use service::PinGatewayService;
