//! # Domain Layer
//!
//! Configuration, error mapping and the pinned identity document.

pub mod config;
pub mod error;
pub mod payload;

pub use config::{
    ConfigError, CorsConfig, Credentials, GatewayConfig, HttpConfig, LimitsConfig, PinataConfig,
};
pub use error::{PinGatewayError, ServiceError};
pub use payload::PinPayload;
