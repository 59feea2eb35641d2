//! Environment-driven configuration.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use storekeep_mongodb::MongoConfig;
use storekeep_postgres::{MaxConnections, PostgresConfig};
use thiserror::Error;

/// Raised when an environment variable is missing or cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("required environment variable {variable} is not set")]
    Missing {
        /// Variable name.
        variable: &'static str,
    },

    /// A variable is set but does not parse.
    #[error("environment variable {variable}={value:?} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        variable: &'static str,
        /// Value as found in the environment.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output, one indented block per event.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Pool settings for the relational store.
    pub postgres: PostgresConfig,
    /// Location of the manager collection.
    pub mongo: MongoConfig,
    /// Listen address (`HOST`).
    pub host: IpAddr,
    /// Listen port (`PORT`).
    pub port: u16,
    /// Subscriber output format (`LOG_FORMAT`).
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|variable| std::env::var(variable).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing {
                variable: "DATABASE_URL",
            })?;

        let max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?;
        let max_connections =
            NonZeroU32::new(max_connections).ok_or_else(|| ConfigError::Invalid {
                variable: "DB_MAX_CONNECTIONS",
                value: max_connections.to_string(),
                reason: "pool size must be at least 1".to_string(),
            })?;

        let postgres = PostgresConfig {
            max_connections: MaxConnections::new(max_connections),
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30)?),
            idle_timeout: Duration::from_secs(parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", 600)?),
        };

        let mongo = MongoConfig::new(
            lookup("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            lookup("MONGODB_DATABASE").unwrap_or_else(|| "storekeep".to_string()),
        );

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("" | "pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    variable: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected `pretty` or `json`".to_string(),
                })
            }
        };

        Ok(Self {
            database_url,
            postgres,
            mongo,
            host: parse_or(&lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "PORT", 3000)?,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, variable: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(variable) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|error: T::Err| ConfigError::Invalid {
            variable,
            reason: error.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&'static str, &str)]) -> Result<AppConfig, ConfigError> {
        let values: HashMap<&'static str, String> = pairs
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect();
        AppConfig::from_lookup(|variable| values.get(variable).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/storekeep")])
            .expect("config loads");

        assert_eq!(config.database_url, "postgres://localhost/storekeep");
        assert_eq!(config.postgres.max_connections.to_string(), "10");
        assert_eq!(config.postgres.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.postgres.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.mongo.uri, "mongodb://localhost:27017");
        assert_eq!(config.mongo.database, "storekeep");
        assert_eq!(config.host, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            config_from(&[]).expect_err("missing url"),
            ConfigError::Missing {
                variable: "DATABASE_URL"
            }
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/storekeep"),
            ("DB_MAX_CONNECTIONS", "25"),
            ("MONGODB_DATABASE", "proj2023"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "json"),
        ])
        .expect("config loads");

        assert_eq!(config.postgres.max_connections.to_string(), "25");
        assert_eq!(config.mongo.database, "proj2023");
        assert_eq!(config.host, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let error = config_from(&[
            ("DATABASE_URL", "postgres://db/storekeep"),
            ("DB_MAX_CONNECTIONS", "0"),
        ])
        .expect_err("zero connections rejected");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                variable: "DB_MAX_CONNECTIONS",
                ..
            }
        ));
    }

    #[test]
    fn unparsable_port_names_the_variable() {
        let error = config_from(&[
            ("DATABASE_URL", "postgres://db/storekeep"),
            ("PORT", "http"),
        ])
        .expect_err("bad port rejected");

        assert!(error.to_string().contains("PORT"));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let error = config_from(&[
            ("DATABASE_URL", "postgres://db/storekeep"),
            ("LOG_FORMAT", "xml"),
        ])
        .expect_err("unknown format rejected");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                variable: "LOG_FORMAT",
                ..
            }
        ));
    }
}
