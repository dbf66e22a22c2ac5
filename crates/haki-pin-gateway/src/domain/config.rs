//! Gateway configuration with validation.

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

/// Pinata JSON pinning endpoint.
pub const DEFAULT_PINATA_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";

/// Main gateway configuration
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Remote pinning service
    pub pinata: PinataConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl GatewayConfig {
    /// Load configuration from the environment.
    ///
    /// - `HAKI_HTTP_HOST` / `HAKI_HTTP_PORT`: bind address (default 0.0.0.0:3000)
    /// - `PINATA_JWT`: bearer token, preferred when set
    /// - `PINATA_API_KEY` / `PINATA_SECRET_API_KEY`: key pair fallback
    /// - `HAKI_PINATA_URL`: pinning endpoint override
    /// - `HAKI_CORS_ORIGINS`: comma separated origins (default `*`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = var("HAKI_HTTP_HOST") {
            config.http.host = host.parse().map_err(|_| ConfigError::Invalid {
                var: "HAKI_HTTP_HOST",
                value: host,
            })?;
        }
        if let Some(port) = var("HAKI_HTTP_PORT") {
            config.http.port = port.parse().map_err(|_| ConfigError::Invalid {
                var: "HAKI_HTTP_PORT",
                value: port,
            })?;
        }
        if let Some(url) = var("HAKI_PINATA_URL") {
            config.pinata.url = url;
        }
        config.pinata.credentials = Credentials::resolve(
            var("PINATA_JWT"),
            var("PINATA_API_KEY"),
            var("PINATA_SECRET_API_KEY"),
        );
        if let Some(origins) = var("HAKI_CORS_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pinata.url.starts_with("http://") && !self.pinata.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "HAKI_PINATA_URL",
                value: self.pinata.url.clone(),
            });
        }
        if self.pinata.request_timeout.is_zero() {
            return Err(ConfigError::InvalidLimit("request_timeout cannot be 0".into()));
        }
        if self.limits.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit("max_body_bytes cannot be 0".into()));
        }
        Ok(())
    }

    /// HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: IpAddr,
    /// Port (default: 3000); 0 binds an ephemeral port
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

/// Remote pinning service configuration
#[derive(Debug, Clone)]
pub struct PinataConfig {
    pub url: String,
    /// `None` makes every pin request fail with a configuration error
    pub credentials: Option<Credentials>,
    pub request_timeout: Duration,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PINATA_URL.to_string(),
            credentials: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Authorization for the remote pinning service.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <jwt>`
    Bearer(String),
    /// `pinata_api_key` and `pinata_secret_api_key` headers
    KeyPair { api_key: String, secret: String },
}

impl Credentials {
    /// A JWT wins; otherwise both halves of the key pair are required.
    pub fn resolve(
        jwt: Option<String>,
        api_key: Option<String>,
        secret: Option<String>,
    ) -> Option<Self> {
        if let Some(jwt) = jwt.filter(|j| !j.is_empty()) {
            return Some(Self::Bearer(jwt));
        }
        match (api_key, secret) {
            (Some(api_key), Some(secret)) if !api_key.is_empty() && !secret.is_empty() => {
                Some(Self::KeyPair { api_key, secret })
            }
            _ => None,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::KeyPair { .. } => "key_pair",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials({}, redacted)", self.mode())
    }
}

/// Request limits
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Max request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}
