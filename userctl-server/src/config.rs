//! Database configuration resolved from the environment
//!
//! Read once at startup. Every variable has a default so a bare
//! `userctl serve` works against a local Postgres.
//!
//! | variable                  | default     |
//! |---------------------------|-------------|
//! | `DB_USER`                 | `postgres`  |
//! | `DB_PASS`                 | `postgres`  |
//! | `DB_NAME`                 | `userctl`   |
//! | `DB_HOST`                 | `localhost` |
//! | `DB_PORT`                 | `5432`      |
//! | `DB_MAX_CONNECTIONS`      | `5`         |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | `5`         |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

/// Default Postgres port
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default maximum connections for the pool.
/// Kept low; every operation is a single round trip.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Postgres connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "userctl".to_string(),
            host: "localhost".to_string(),
            port: DEFAULT_DB_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

// Password is never printed.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl DbConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// Unset and empty variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            user: get("DB_USER").unwrap_or(defaults.user),
            password: get("DB_PASS").unwrap_or(defaults.password),
            database: get("DB_NAME").unwrap_or(defaults.database),
            host: get("DB_HOST").unwrap_or(defaults.host),
            port: parse_var("DB_PORT", get("DB_PORT"))?.unwrap_or(defaults.port),
            max_connections: parse_var("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"))?
                .unwrap_or(defaults.max_connections),
            acquire_timeout: parse_var::<u64>(
                "DB_ACQUIRE_TIMEOUT_SECS",
                get("DB_ACQUIRE_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout),
        })
    }

    /// Build sqlx connect options.
    ///
    /// Uses the structured builder so passwords with URL-reserved
    /// characters need no escaping.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.map(|value| {
        value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        })
    })
    .transpose()
}
