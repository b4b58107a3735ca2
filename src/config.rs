use std::str::FromStr;
use std::time::Duration;

use crate::outbox::{CommitMode, ProcessorConfig, DEFAULT_BATCH_SIZE};

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read once at startup from environment variables. Unset variables fall
// back to defaults; set but malformed ones are errors.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is required for the selected backend")]
    Missing(&'static str),
}

/// Storage backend behind the wallet repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalletBackend {
    #[default]
    Memory,
    Postgres,
    Scylla,
    Redis,
}

impl FromStr for WalletBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(WalletBackend::Memory),
            "postgres" | "postgresql" => Ok(WalletBackend::Postgres),
            "scylla" | "scylladb" => Ok(WalletBackend::Scylla),
            "redis" => Ok(WalletBackend::Redis),
            other => Err(format!("unknown wallet backend `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Enables PostgreSQL for the outbox and library cards when set
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub scylla_node: String,
    pub scylla_keyspace: String,
    pub redis_url: String,
    pub wallet_backend: WalletBackend,
    pub outbox: ProcessorConfig,
    pub metrics_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            scylla_node: "127.0.0.1:9042".to_string(),
            scylla_keyspace: "wallets_ks".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            wallet_backend: WalletBackend::default(),
            outbox: ProcessorConfig::default(),
            metrics_port: 9090,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            scylla_node: lookup("SCYLLA_NODE").unwrap_or(defaults.scylla_node),
            scylla_keyspace: lookup("SCYLLA_KEYSPACE").unwrap_or(defaults.scylla_keyspace),
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            wallet_backend: parse_or(&lookup, "WALLET_BACKEND", defaults.wallet_backend)?,
            outbox: ProcessorConfig {
                batch_size: parse_or(&lookup, "OUTBOX_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
                poll_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "OUTBOX_POLL_INTERVAL_SECS",
                    defaults.outbox.poll_interval.as_secs(),
                )?),
                commit_mode: parse_or(&lookup, "OUTBOX_COMMIT_MODE", CommitMode::default())?,
            },
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.outbox.batch_size == 0 {
            return Err(ConfigError::Invalid {
                name: "OUTBOX_BATCH_SIZE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.outbox.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "OUTBOX_POLL_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.wallet_backend == WalletBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.wallet_backend, WalletBackend::Memory);
        assert_eq!(config.outbox.batch_size, 100);
        assert_eq!(config.outbox.poll_interval, Duration::from_secs(10));
        assert_eq!(config.outbox.commit_mode, CommitMode::PerMessage);
        assert_eq!(config.metrics_port, 9090);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("WALLET_BACKEND", "Postgres"),
            ("OUTBOX_BATCH_SIZE", "25"),
            ("OUTBOX_POLL_INTERVAL_SECS", "2"),
            ("OUTBOX_COMMIT_MODE", "per-batch"),
            ("METRICS_PORT", "9191"),
        ])
        .unwrap();

        assert_eq!(config.wallet_backend, WalletBackend::Postgres);
        assert_eq!(config.outbox.batch_size, 25);
        assert_eq!(config.outbox.poll_interval, Duration::from_secs(2));
        assert_eq!(config.outbox.commit_mode, CommitMode::PerBatch);
        assert_eq!(config.metrics_port, 9191);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = config_from(&[("OUTBOX_BATCH_SIZE", "lots")]);
        assert!(matches!(result, Err(ConfigError::Invalid { name: "OUTBOX_BATCH_SIZE", .. })));

        let result = config_from(&[("WALLET_BACKEND", "mongo")]);
        assert!(matches!(result, Err(ConfigError::Invalid { name: "WALLET_BACKEND", .. })));

        let result = config_from(&[("OUTBOX_BATCH_SIZE", "0")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_postgres_backend_requires_database_url() {
        let result = config_from(&[("WALLET_BACKEND", "postgres")]);

        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }
}
