//! Connects the service to its infrastructure before it accepts requests.

use std::sync::Arc;
use std::time::Duration;

use common::retry_with_backoff;
use domain::{InMemoryOrderStore, OrderStore, PostgresOrderStore, StoreError};
use event_channel::{ChannelError, EventChannel, InMemoryEventChannel, KafkaConfig, KafkaEventChannel};
use saga::{
    AccountGateway, CatalogGateway, GatewayError, HttpAccountGateway, HttpCatalogGateway,
    InMemoryAccountGateway, InMemoryCatalogGateway,
};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::Config;

/// Errors that stop the service from starting.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Order store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Event channel unavailable: {0}")]
    Channel(#[from] ChannelError),

    #[error("Gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// Where account lookups are served from.
#[derive(Clone)]
pub enum AccountBackend {
    /// Accounts live in this process and can be created through the API.
    Local(InMemoryAccountGateway),
    /// Accounts are owned by a remote service.
    Remote(Arc<dyn AccountGateway>),
}

impl AccountBackend {
    /// Returns the gateway the orchestrator should use.
    pub fn gateway(&self) -> Arc<dyn AccountGateway> {
        match self {
            AccountBackend::Local(gateway) => Arc::new(gateway.clone()),
            AccountBackend::Remote(gateway) => Arc::clone(gateway),
        }
    }

    /// Returns the in-process gateway, if accounts are local.
    pub fn local(&self) -> Option<&InMemoryAccountGateway> {
        match self {
            AccountBackend::Local(gateway) => Some(gateway),
            AccountBackend::Remote(_) => None,
        }
    }
}

/// Everything the service runs on.
pub struct Infrastructure {
    pub store: Arc<dyn OrderStore>,
    pub channel: Arc<dyn EventChannel>,
    pub accounts: AccountBackend,
    pub catalog: Arc<dyn CatalogGateway>,
}

/// Connects store and channel, retrying per the configured policy, and
/// builds the collaborator gateways.
pub async fn connect(config: &Config) -> Result<Infrastructure, BootstrapError> {
    let store = connect_store(config).await?;
    let channel = connect_channel(config).await?;

    let accounts = match &config.account_service_url {
        Some(url) => {
            tracing::info!(%url, "using remote account service");
            AccountBackend::Remote(Arc::new(HttpAccountGateway::new(
                url.as_str(),
                config.lookup_timeout,
            )?))
        }
        None => {
            tracing::info!("ACCOUNT_SERVICE_URL not set, serving accounts in-process");
            AccountBackend::Local(InMemoryAccountGateway::with_channel(Arc::clone(&channel)))
        }
    };

    let catalog: Arc<dyn CatalogGateway> = match &config.catalog_service_url {
        Some(url) => {
            tracing::info!(%url, "using remote catalog service");
            Arc::new(HttpCatalogGateway::new(url.as_str(), config.lookup_timeout)?)
        }
        None => {
            tracing::info!("CATALOG_SERVICE_URL not set, using empty in-process catalog");
            Arc::new(InMemoryCatalogGateway::new())
        }
    };

    Ok(Infrastructure {
        store,
        channel,
        accounts,
        catalog,
    })
}

async fn connect_store(config: &Config) -> Result<Arc<dyn OrderStore>, BootstrapError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set, using in-memory order store");
        return Ok(Arc::new(InMemoryOrderStore::new()));
    };

    let policy = config.bootstrap_retry_policy();
    let store = retry_with_backoff(&policy, "postgres", |attempt| async move {
        tracing::debug!(attempt, "connecting to postgres");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        let store = PostgresOrderStore::new(pool);
        store.run_migrations().await?;
        Ok::<_, StoreError>(store)
    })
    .await?;

    tracing::info!("connected to postgres");
    Ok(Arc::new(store))
}

async fn connect_channel(config: &Config) -> Result<Arc<dyn EventChannel>, BootstrapError> {
    let Some(brokers) = config.kafka_brokers.as_deref() else {
        tracing::info!("KAFKA_BROKERS not set, using in-process event channel");
        return Ok(Arc::new(InMemoryEventChannel::new()));
    };

    let policy = config.bootstrap_retry_policy();
    let channel = retry_with_backoff(&policy, "kafka", |attempt| async move {
        tracing::debug!(attempt, "creating kafka producer");
        KafkaEventChannel::new(KafkaConfig::new(brokers))
    })
    .await?;

    Ok(Arc::new(channel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_run_fully_in_process() {
        let infra = connect(&Config::default()).await.unwrap();
        assert!(infra.accounts.local().is_some());
    }

    #[tokio::test]
    async fn test_remote_services_are_used_when_configured() {
        let config = Config {
            account_service_url: Some("http://accounts:8080".to_string()),
            catalog_service_url: Some("http://catalog:8080".to_string()),
            ..Config::default()
        };

        let infra = connect(&config).await.unwrap();
        assert!(infra.accounts.local().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_database_gives_up_after_bounded_retries() {
        let config = Config {
            database_url: Some("postgres://nobody@127.0.0.1:1/none".to_string()),
            bootstrap_retry_delay: Duration::from_millis(1),
            bootstrap_retry_max_attempts: Some(2),
            ..Config::default()
        };

        let result = connect(&config).await;
        assert!(matches!(result, Err(BootstrapError::Store(_))));
    }
}
