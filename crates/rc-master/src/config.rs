//! # Master Configuration
//!
//! Unified configuration for the bus, delivery pool, RPC gateway and realm.
//! Every value has a default and can be overridden from an `RC_*`
//! environment variable.

use rc_01_endpoints::DeliveryConfig;
use rc_03_rpc_gateway::GatewayConfig;
use shared_types::ADDRESS_PREFIX_LENGTH;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default master communication ID.
pub const DEFAULT_MASTER_COMM_ID: &str = "ZZMASTER";

/// Complete master configuration.
#[derive(Debug, Clone, Default)]
pub struct MasterConfig {
    /// Message bus.
    pub bus: BusConfig,
    /// Delivery worker pool.
    pub delivery: DeliveryConfig,
    /// RPC front.
    pub gateway: GatewayConfig,
    /// Container realm.
    pub realm: RealmConfig,
    /// Seed accounts.
    pub admin: AdminConfig,
}

/// Message bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Broadcast channel capacity.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Realm configuration.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    /// Communication ID of the master on the bus.
    pub comm_id: String,
    /// How long createContainer waits for the environment.
    pub ready_timeout_secs: u64,
    /// Containers the local machine accepts.
    pub capacity: usize,
    /// Answer container start requests in-process instead of waiting for a
    /// remote environment host.
    pub loopback_host: bool,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            comm_id: DEFAULT_MASTER_COMM_ID.to_string(),
            ready_timeout_secs: 30,
            capacity: 64,
            loopback_host: true,
        }
    }
}

impl RealmConfig {
    /// Readiness timeout as a duration.
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

/// Accounts created at startup.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// `(name, password)` pairs.
    pub users: Vec<(String, String)>,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bus capacity cannot be 0")]
    BusCapacity,

    #[error("delivery pool needs at least one worker and one queue slot")]
    DeliveryPool,

    #[error("gateway: {0}")]
    Gateway(String),

    #[error("master comm id \"{0}\" is too short")]
    CommId(String),

    #[error("container ready timeout cannot be 0")]
    ReadyTimeout,

    #[error("seed user \"{0}\" has an empty password")]
    SeedPassword(String),
}

impl MasterConfig {
    /// Load defaults overridden by the environment.
    ///
    /// # Environment Variables
    ///
    /// - `RC_BUS_CAPACITY`
    /// - `RC_DELIVERY_WORKERS`, `RC_DELIVERY_QUEUE`
    /// - `RC_RPC_HOST`, `RC_RPC_PORT`
    /// - `RC_MASTER_COMM_ID`, `RC_CONTAINER_READY_TIMEOUT`,
    ///   `RC_REALM_CAPACITY`, `RC_LOOPBACK_HOST`
    /// - `RC_ADMIN_USER`, `RC_ADMIN_PASSWORD`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        override_parsed(&lookup, "RC_BUS_CAPACITY", &mut config.bus.capacity);
        override_parsed(&lookup, "RC_DELIVERY_WORKERS", &mut config.delivery.workers);
        override_parsed(&lookup, "RC_DELIVERY_QUEUE", &mut config.delivery.queue_capacity);
        override_parsed(&lookup, "RC_RPC_HOST", &mut config.gateway.host);
        override_parsed(&lookup, "RC_RPC_PORT", &mut config.gateway.port);
        if let Some(comm_id) = lookup("RC_MASTER_COMM_ID") {
            config.realm.comm_id = comm_id;
        }
        override_parsed(
            &lookup,
            "RC_CONTAINER_READY_TIMEOUT",
            &mut config.realm.ready_timeout_secs,
        );
        override_parsed(&lookup, "RC_REALM_CAPACITY", &mut config.realm.capacity);
        override_parsed(&lookup, "RC_LOOPBACK_HOST", &mut config.realm.loopback_host);

        if let (Some(user), Some(password)) = (lookup("RC_ADMIN_USER"), lookup("RC_ADMIN_PASSWORD")) {
            config.admin.users.push((user, password));
        }

        config
    }

    /// Check the configuration before startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.capacity == 0 {
            return Err(ConfigError::BusCapacity);
        }
        if self.delivery.workers == 0 || self.delivery.queue_capacity == 0 {
            return Err(ConfigError::DeliveryPool);
        }
        self.gateway
            .validate()
            .map_err(|e| ConfigError::Gateway(e.to_string()))?;
        if self.realm.comm_id.len() <= ADDRESS_PREFIX_LENGTH {
            return Err(ConfigError::CommId(self.realm.comm_id.clone()));
        }
        if self.realm.ready_timeout_secs == 0 {
            return Err(ConfigError::ReadyTimeout);
        }
        if let Some((user, _)) = self.admin.users.iter().find(|(_, pw)| pw.is_empty()) {
            return Err(ConfigError::SeedPassword(user.clone()));
        }
        Ok(())
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable configuration value"),
        }
    }
}
