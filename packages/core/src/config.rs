use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:3001";
pub const DEFAULT_QUESTION_SERVICE_URL: &str = "http://localhost:8080";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MATCH_TTL_SECS: u64 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    DynamoDb { table_name: String },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingConfig {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub user_service_url: String,
    pub question_service_url: String,
    pub upstream_timeout: Duration,
    pub store_timeout: Duration,
    pub match_ttl: Duration,
}

impl MatchingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Unset or blank variables
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let store_backend = match var("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("dynamodb") => StoreBackend::DynamoDb {
                table_name: var("MATCHING_TABLE").ok_or(ConfigError::Missing("MATCHING_TABLE"))?,
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(MatchingConfig {
            port: parse_or(var("PORT"), "PORT", DEFAULT_PORT)?,
            store_backend,
            user_service_url: var("USER_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_USER_SERVICE_URL.to_string()),
            question_service_url: var("QUESTION_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_QUESTION_SERVICE_URL.to_string()),
            upstream_timeout: seconds_or(
                var("UPSTREAM_TIMEOUT_SECS"),
                "UPSTREAM_TIMEOUT_SECS",
                DEFAULT_UPSTREAM_TIMEOUT_SECS,
            )?,
            store_timeout: seconds_or(
                var("STORE_TIMEOUT_SECS"),
                "STORE_TIMEOUT_SECS",
                DEFAULT_STORE_TIMEOUT_SECS,
            )?,
            match_ttl: seconds_or(var("MATCH_TTL_SECS"), "MATCH_TTL_SECS", DEFAULT_MATCH_TTL_SECS)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn seconds_or(
    raw: Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let seconds: u64 = parse_or(raw, name, default)?;
    if seconds == 0 {
        return Err(ConfigError::InvalidValue {
            name,
            value: seconds.to_string(),
        });
    }
    Ok(Duration::from_secs(seconds))
}
