//! Account directory read model, fed by `account.created`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AccountId;
use event_channel::{DomainEvent, EventEnvelope};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A known account, as announced by the account service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEntry {
    pub account_id: AccountId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct DirectoryState {
    accounts: HashMap<AccountId, AccountEntry>,
    position: ProjectionPosition,
}

/// Read model listing every announced account.
///
/// The first announcement of an account wins; later copies are skipped.
#[derive(Clone, Default)]
pub struct AccountDirectoryView {
    state: Arc<RwLock<DirectoryState>>,
}

impl AccountDirectoryView {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an account by id.
    pub async fn get(&self, account_id: &AccountId) -> Option<AccountEntry> {
        self.state.read().await.accounts.get(account_id).cloned()
    }

    /// Lists accounts sorted by name, then id.
    pub async fn list(&self) -> Vec<AccountEntry> {
        let mut entries: Vec<_> = self.state.read().await.accounts.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.account_id.cmp(&b.account_id)));
        entries
    }
}

#[async_trait]
impl Projection for AccountDirectoryView {
    fn name(&self) -> &'static str {
        "AccountDirectoryView"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        let DomainEvent::AccountCreated(data) = &envelope.event else {
            return Ok(());
        };

        let mut state = self.state.write().await;
        if state.accounts.contains_key(&data.account_id) {
            state.position = state.position.skipped();
            return Ok(());
        }

        state.accounts.insert(
            data.account_id.clone(),
            AccountEntry {
                account_id: data.account_id.clone(),
                name: data.name.clone(),
                created_at: envelope.occurred_at,
            },
        );
        state.position = state.position.applied();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = DirectoryState::default();
        Ok(())
    }
}

impl ReadModel for AccountDirectoryView {
    fn name(&self) -> &'static str {
        "AccountDirectoryView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.accounts.len())
            .unwrap_or(0)
    }
}
