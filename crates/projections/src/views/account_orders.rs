//! Account orders read model: per-account order statistics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, OrderId};
use domain::Money;
use event_channel::{DomainEvent, EventEnvelope};
use tokio::sync::RwLock;

use crate::{ProjectionError, Result};
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Per-account order statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountOrdersSummary {
    pub account_id: AccountId,
    pub order_count: u64,
    pub total_spent: Money,
    /// Order ids in the order their events arrived.
    pub order_ids: Vec<OrderId>,
    pub last_order_at: DateTime<Utc>,
}

#[derive(Default)]
struct AccountOrdersState {
    accounts: HashMap<AccountId, AccountOrdersSummary>,
    /// Orders already counted; redeliveries of these are ignored.
    seen_orders: HashSet<OrderId>,
    position: ProjectionPosition,
}

/// Read model view for per-account order statistics.
///
/// Deduplicates by order id, so a redelivered or re-published
/// `order.created` never counts an order twice.
#[derive(Clone, Default)]
pub struct AccountOrdersView {
    state: Arc<RwLock<AccountOrdersState>>,
}

impl AccountOrdersView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets statistics for a specific account.
    pub async fn get_account(&self, account_id: &AccountId) -> Option<AccountOrdersSummary> {
        self.state.read().await.accounts.get(account_id).cloned()
    }

    /// Gets all account statistics.
    pub async fn get_all_accounts(&self) -> Vec<AccountOrdersSummary> {
        self.state.read().await.accounts.values().cloned().collect()
    }

    /// Gets the accounts with the highest total spend, at most `limit` of them.
    pub async fn get_top_accounts(&self, limit: usize) -> Vec<AccountOrdersSummary> {
        let state = self.state.read().await;
        let mut accounts: Vec<_> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            b.total_spent
                .cmp(&a.total_spent)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        accounts.truncate(limit);
        accounts
    }
}

#[async_trait]
impl Projection for AccountOrdersView {
    fn name(&self) -> &'static str {
        "AccountOrdersView"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        let DomainEvent::OrderCreated(data) = &envelope.event else {
            return Ok(());
        };

        let mut state = self.state.write().await;
        if state.seen_orders.contains(&data.order_id) {
            tracing::debug!(order_id = %data.order_id, "duplicate order.created ignored");
            state.position = state.position.skipped();
            return Ok(());
        }

        let spent_before = state
            .accounts
            .get(&data.account_id)
            .map_or_else(Money::zero, |summary| summary.total_spent);
        let total_spent = spent_before.checked_add(data.total_price).ok_or_else(|| {
            ProjectionError::Projection(format!(
                "total spent overflows for account {}",
                data.account_id
            ))
        })?;

        state.seen_orders.insert(data.order_id);
        let entry = state
            .accounts
            .entry(data.account_id.clone())
            .or_insert_with(|| AccountOrdersSummary {
                account_id: data.account_id.clone(),
                order_count: 0,
                total_spent: Money::zero(),
                order_ids: Vec::new(),
                last_order_at: envelope.occurred_at,
            });
        entry.order_count += 1;
        entry.total_spent = total_spent;
        entry.order_ids.push(data.order_id);
        entry.last_order_at = entry.last_order_at.max(envelope.occurred_at);

        state.position = state.position.applied();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = AccountOrdersState::default();
        Ok(())
    }
}

impl ReadModel for AccountOrdersView {
    fn name(&self) -> &'static str {
        "AccountOrdersView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.accounts.len())
            .unwrap_or(0)
    }
}
