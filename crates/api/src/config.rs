//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::RetryPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string (unset: in-memory store)
/// - `ACCOUNT_SERVICE_URL`, `CATALOG_SERVICE_URL`: collaborator base URLs
///   (unset: in-process services)
/// - `KAFKA_BROKERS`: comma-separated brokers (unset: in-process channel)
/// - `KAFKA_CONSUMER_GROUP`: consumer group prefix (default: `"order-service"`)
/// - `LOOKUP_TIMEOUT_MS`: deadline for account/catalog lookups (default: `2000`)
/// - `BOOTSTRAP_RETRY_DELAY_MS`: delay between startup attempts (default: `2000`)
/// - `BOOTSTRAP_RETRY_MAX_ATTEMPTS`: give up after this many (unset: never)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub account_service_url: Option<String>,
    pub catalog_service_url: Option<String>,
    pub kafka_brokers: Option<String>,
    pub kafka_consumer_group: String,
    pub lookup_timeout: Duration,
    pub bootstrap_retry_delay: Duration,
    pub bootstrap_retry_max_attempts: Option<u32>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| {
            Duration::from_millis(var(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };
        let defaults = Self::default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: var("DATABASE_URL"),
            account_service_url: var("ACCOUNT_SERVICE_URL"),
            catalog_service_url: var("CATALOG_SERVICE_URL"),
            kafka_brokers: var("KAFKA_BROKERS"),
            kafka_consumer_group: var("KAFKA_CONSUMER_GROUP")
                .unwrap_or(defaults.kafka_consumer_group),
            lookup_timeout: millis("LOOKUP_TIMEOUT_MS", 2000),
            bootstrap_retry_delay: millis("BOOTSTRAP_RETRY_DELAY_MS", 2000),
            bootstrap_retry_max_attempts: var("BOOTSTRAP_RETRY_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retry policy for connecting to the database and broker at startup.
    pub fn bootstrap_retry_policy(&self) -> RetryPolicy {
        match self.bootstrap_retry_max_attempts {
            Some(max) => RetryPolicy::bounded(
                max,
                self.bootstrap_retry_delay,
                self.bootstrap_retry_delay * 8,
            ),
            None => RetryPolicy::forever(self.bootstrap_retry_delay),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            database_url: None,
            account_service_url: None,
            catalog_service_url: None,
            kafka_brokers: None,
            kafka_consumer_group: "order-service".to_string(),
            lookup_timeout: Duration::from_millis(2000),
            bootstrap_retry_delay: Duration::from_millis(2000),
            bootstrap_retry_max_attempts: None,
        }
    }
}
