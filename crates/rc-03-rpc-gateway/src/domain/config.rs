//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Default RPC port.
pub const DEFAULT_PORT: u16 = 9010;

/// HTTP header carrying the authenticated client identity.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-client-id";

/// RPC front configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port
    pub port: u16,
    /// Header set by the authenticating proxy
    pub identity_header: String,
    /// Maximum operations in one batch request
    pub max_batch_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            max_batch_size: 32,
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.identity_header.trim().is_empty() {
            return Err(ConfigError::InvalidHeader);
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_batch_size cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Server bind address
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("port cannot be 0")]
    InvalidPort,

    #[error("identity header cannot be empty")]
    InvalidHeader,

    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}
