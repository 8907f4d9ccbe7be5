//! Account gateway trait and in-memory implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::AccountId;
use domain::Account;
use event_channel::{DomainEvent, EventChannel, EventEnvelope};
use tokio::sync::RwLock;

use crate::error::GatewayError;

/// Read access to the account service.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Looks up an account. `Ok(None)` means the account does not exist.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, GatewayError>;
}

#[async_trait]
impl<T: AccountGateway + ?Sized> AccountGateway for Arc<T> {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, GatewayError> {
        (**self).get_account(id).await
    }
}

#[derive(Default)]
struct InMemoryAccountState {
    accounts: Vec<Account>,
    fail_on_lookup: bool,
    latency: Option<Duration>,
}

/// In-memory account service.
///
/// Besides answering lookups it can register accounts, announcing each one
/// with an `account.created` event when a channel is attached.
#[derive(Clone, Default)]
pub struct InMemoryAccountGateway {
    state: Arc<RwLock<InMemoryAccountState>>,
    channel: Option<Arc<dyn EventChannel>>,
}

impl InMemoryAccountGateway {
    /// Creates an empty gateway that announces nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty gateway that announces new accounts on `channel`.
    pub fn with_channel(channel: Arc<dyn EventChannel>) -> Self {
        Self {
            state: Arc::default(),
            channel: Some(channel),
        }
    }

    /// Seeds an account without announcing it.
    pub async fn insert(&self, account: Account) {
        let mut state = self.state.write().await;
        state.accounts.retain(|a| a.id != account.id);
        state.accounts.push(account);
    }

    /// Registers a new account under a fresh id.
    ///
    /// The `account.created` announcement is best-effort: a publish failure
    /// is logged and the account is still created.
    #[tracing::instrument(skip(self))]
    pub async fn create_account(&self, name: &str) -> Account {
        let account = Account::new(uuid::Uuid::new_v4().to_string(), name);
        self.state.write().await.accounts.push(account.clone());

        if let Some(channel) = &self.channel {
            let envelope = EventEnvelope::new(DomainEvent::account_created(&account));
            if let Err(e) = channel.publish_event(&envelope).await {
                tracing::warn!(error = %e, account_id = %account.id, "failed to announce account");
            }
        }

        tracing::info!(account_id = %account.id, "account created");
        account
    }

    /// Lists accounts in registration order.
    pub async fn list_accounts(&self, skip: usize, take: usize) -> Vec<Account> {
        self.state
            .read()
            .await
            .accounts
            .iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect()
    }

    /// Configures lookups to fail as if the service were down.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }

    /// Delays every lookup by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }
}

#[async_trait]
impl AccountGateway for InMemoryAccountGateway {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, GatewayError> {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().await;
        if state.fail_on_lookup {
            return Err(GatewayError::Unavailable("account service down".to_string()));
        }
        Ok(state.accounts.iter().find(|a| &a.id == id).cloned())
    }
}
