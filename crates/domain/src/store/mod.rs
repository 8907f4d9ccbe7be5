//! Persistence port for orders.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use common::{AccountId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::order::Order;

pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

/// Window over an account's orders, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub skip: u64,
    pub take: u64,
}

impl Pagination {
    /// Largest page a caller may ask for.
    pub const MAX_TAKE: u64 = 100;

    /// Creates a page window, clamping `take` to `1..=MAX_TAKE`.
    pub fn new(skip: u64, take: u64) -> Self {
        Self {
            skip,
            take: take.clamp(1, Self::MAX_TAKE),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, Self::MAX_TAKE)
    }
}

/// Durable storage for orders.
///
/// The order service is the only writer. An order is written exactly once,
/// atomically with its lines, and never updated.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order together with all of its lines.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads a single order by id.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists an account's orders in creation order.
    async fn list_for_account(
        &self,
        account_id: &AccountId,
        page: Pagination,
    ) -> Result<Vec<Order>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn insert(&self, order: &Order) -> Result<()> {
        (**self).insert(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        (**self).get(order_id).await
    }

    async fn list_for_account(
        &self,
        account_id: &AccountId,
        page: Pagination,
    ) -> Result<Vec<Order>> {
        (**self).list_for_account(account_id, page).await
    }
}
