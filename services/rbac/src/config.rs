//! Service settings
//!
//! Read from `RBAC_` prefixed environment variables, e.g. `RBAC_LISTEN_ADDR`,
//! `RBAC_LOG_LEVEL`, `RBAC_ROLE_EXPIRY` and `RBAC_STORAGE`. Database and JWT
//! settings keep their own loaders ([`common::database::DatabaseConfig`] and
//! [`crate::jwt::JwtConfig`]).

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::aggregator::ExpiryPolicy;

/// Where the stores keep their data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local tables, lost on exit
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to
    pub listen_addr: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub role_expiry: ExpiryPolicy,
    pub storage: StorageBackend,
}

impl ServiceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("listen_addr", "0.0.0.0:3000")?
            .set_default("log_level", "info")?
            .set_default("role_expiry", "ignore")?
            .set_default("storage", "postgres")?
            .add_source(Environment::with_prefix("RBAC"))
            .build()?
            .try_deserialize()
    }
}
