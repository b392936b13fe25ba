//! Auth service configuration.
//!
//! Values come from the process environment (after `.env` is loaded by the
//! binary). `from_lookup` takes any key lookup so tests can inject values.

use std::env;
use std::str::FromStr;

use chrono::{Duration, Utc};
use thiserror::Error;

use common::{DatabaseConfig, JwtConfig};
use domain::{WorkFactor, MIN_JWT_SECRET_LENGTH};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 50051;
const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19_456;
const DEFAULT_ARGON2_ITERATIONS: u32 = 2;
const DEFAULT_ARGON2_PARALLELISM: u32 = 1;

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    /// Argon2id cost for new password hashes
    pub work_factor: WorkFactor,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_defaults = JwtConfig::default();
        let db_defaults = DatabaseConfig::default();

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let config = Self {
            jwt: JwtConfig {
                secret,
                issuer: lookup("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
                access_ttl_minutes: parse_or(
                    &lookup,
                    "ACCESS_TOKEN_TTL_MINUTES",
                    jwt_defaults.access_ttl_minutes,
                )?,
                refresh_ttl_hours: parse_or(
                    &lookup,
                    "REFRESH_TOKEN_TTL_HOURS",
                    jwt_defaults.refresh_ttl_hours,
                )?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(db_defaults.url),
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    db_defaults.max_connections,
                )?,
                min_connections: parse_or(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    db_defaults.min_connections,
                )?,
            },
            work_factor: WorkFactor::new(
                parse_or(&lookup, "ARGON2_MEMORY_KIB", DEFAULT_ARGON2_MEMORY_KIB)?,
                parse_or(&lookup, "ARGON2_ITERATIONS", DEFAULT_ARGON2_ITERATIONS)?,
                parse_or(&lookup, "ARGON2_PARALLELISM", DEFAULT_ARGON2_PARALLELISM)?,
            ),
            host: lookup("AUTH_SERVICE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "AUTH_SERVICE_PORT", DEFAULT_PORT)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::invalid(
                "JWT_SECRET",
                format!("must be at least {} characters", MIN_JWT_SECRET_LENGTH),
            ));
        }
        if self.jwt.issuer.is_empty() {
            return Err(ConfigError::invalid("JWT_ISSUER", "must not be empty"));
        }
        if self.jwt.access_ttl_minutes <= 0 {
            return Err(ConfigError::invalid(
                "ACCESS_TOKEN_TTL_MINUTES",
                "must be positive",
            ));
        }
        let access_ttl = lifetime(self.jwt.checked_access_ttl(), "ACCESS_TOKEN_TTL_MINUTES")?;
        let refresh_ttl = lifetime(self.jwt.checked_refresh_ttl(), "REFRESH_TOKEN_TTL_HOURS")?;
        if access_ttl >= refresh_ttl {
            return Err(ConfigError::invalid(
                "REFRESH_TOKEN_TTL_HOURS",
                "refresh lifetime must be longer than access lifetime",
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::invalid(
                "DATABASE_MIN_CONNECTIONS",
                "must not exceed DATABASE_MAX_CONNECTIONS",
            ));
        }
        self.work_factor
            .validate()
            .map_err(|e| ConfigError::invalid("ARGON2_MEMORY_KIB", e.to_string()))?;

        Ok(())
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A token lifetime must fit in a `Duration` and in an expiry timestamp.
fn lifetime(ttl: Option<Duration>, key: &'static str) -> Result<Duration, ConfigError> {
    ttl.filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| ConfigError::invalid(key, "lifetime is out of range"))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, e.to_string())),
        None => Ok(default),
    }
}
