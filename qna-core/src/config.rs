//! Service configuration
//!
//! Store coordinates and pool sizing, read from `QNA_*` environment
//! variables. The server binary loads `.env` files before calling
//! `from_env`, so either mechanism works.
//!
//! Environment variables:
//!   QNA_DB_HOST                  Store host (default: localhost)
//!   QNA_DB_PORT                  Store port (default: 5432)
//!   QNA_DB_NAME                  Database name (default: qna)
//!   QNA_DB_USER                  Role name (default: postgres)
//!   QNA_DB_PASSWORD              Password (default: empty)
//!   QNA_POOL_MIN_CONNECTIONS     Idle floor for the pool (default: 1)
//!   QNA_POOL_MAX_CONNECTIONS     Pool cap (default: 5)
//!   QNA_POOL_ACQUIRE_TIMEOUT_MS  Deadline for acquiring a connection (default: 5000)
//!   QNA_STATEMENT_TIMEOUT_MS     Server-side statement deadline (default: 30000)

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Store connection coordinates plus pool sizing.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub pool: PoolConfig,
}

impl DatabaseConfig {
    /// Build the configuration from `QNA_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or("QNA_DB_HOST", "localhost"),
            port: env_parse("QNA_DB_PORT", 5432)?,
            dbname: env_or("QNA_DB_NAME", "qna"),
            user: env_or("QNA_DB_USER", "postgres"),
            password: env_or("QNA_DB_PASSWORD", ""),
            pool: PoolConfig::from_env()?,
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5432,
            dbname: "qna".to_owned(),
            user: "postgres".to_owned(),
            password: String::new(),
            pool: PoolConfig::default(),
        }
    }
}

/// Connection pool sizing and deadlines.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Connections kept open even when idle.
    pub min_connections: u32,
    /// Hard cap on live connections.
    pub max_connections: u32,
    /// How long `acquire()` may wait for a free connection.
    pub acquire_timeout: Duration,
    /// Server-side deadline applied to every statement.
    pub statement_timeout: Duration,
}

impl PoolConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            min_connections: env_parse("QNA_POOL_MIN_CONNECTIONS", 1)?,
            max_connections: env_parse("QNA_POOL_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_millis(env_parse(
                "QNA_POOL_ACQUIRE_TIMEOUT_MS",
                5_000,
            )?),
            statement_timeout: Duration::from_millis(env_parse(
                "QNA_STATEMENT_TIMEOUT_MS",
                30_000,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency of the sizing values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "QNA_POOL_MAX_CONNECTIONS",
                reason: "must be at least 1".to_owned(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                var: "QNA_POOL_MIN_CONNECTIONS",
                reason: format!(
                    "must not exceed the pool cap of {}",
                    self.max_connections
                ),
            });
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(30),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_owned())
}

fn env_parse<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
            var,
            reason: err.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
