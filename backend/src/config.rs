//! Application settings loaded via OrthoConfig.
//!
//! Values layer defaults, an optional configuration file and `TENANCY_*`
//! environment variables.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::persistence::PoolConfig;

const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIGNUP_TIMEOUT_SECS: u64 = 15;

/// Settings for the composition root.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TENANCY")]
pub struct AppSettings {
    /// PostgreSQL connection string. Without it only the in-memory store is
    /// available.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept open.
    pub pool_min_idle: Option<u32>,
    /// Pool checkout timeout in seconds.
    pub pool_connection_timeout_secs: Option<u64>,
    /// Deadline applied to each signup, in seconds.
    pub signup_timeout_secs: Option<u64>,
    /// Apply pending migrations before serving requests.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// Configured connection string, if any.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Pool configuration, when a database is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        self.database_url().map(|url| {
            PoolConfig::new(url)
                .with_max_size(self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE))
                .with_min_idle(Some(self.pool_min_idle.unwrap_or(DEFAULT_POOL_MIN_IDLE)))
                .with_connection_timeout(Duration::from_secs(
                    self.pool_connection_timeout_secs
                        .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
                ))
        })
    }

    /// Deadline applied to each signup.
    pub fn signup_timeout(&self) -> Duration {
        Duration::from_secs(
            self.signup_timeout_secs
                .unwrap_or(DEFAULT_SIGNUP_TIMEOUT_SECS),
        )
    }
}
