//! Catalog gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::{Money, Product};
use tokio::sync::RwLock;

use crate::error::GatewayError;

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Resolves a batch of product ids.
    ///
    /// Unknown ids are left out of the result rather than reported as errors,
    /// so the result may be a strict subset of the request.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, GatewayError>;
}

#[async_trait]
impl<T: CatalogGateway + ?Sized> CatalogGateway for Arc<T> {
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, GatewayError> {
        (**self).get_products(ids).await
    }
}

#[derive(Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    fail_on_lookup: bool,
    latency: Option<Duration>,
}

/// In-memory product catalog for testing and local runs.
#[derive(Clone, Default)]
pub struct InMemoryCatalogGateway {
    state: Arc<RwLock<InMemoryCatalogState>>,
    lookups: Arc<AtomicUsize>,
}

impl InMemoryCatalogGateway {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub async fn upsert(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Changes the current price of a product. Returns false if it is unknown.
    pub async fn set_price(&self, id: &ProductId, price: Money) -> bool {
        match self.state.write().await.products.get_mut(id) {
            Some(product) => {
                product.price = price;
                true
            }
            None => false,
        }
    }

    /// Removes a product from the catalog.
    pub async fn remove(&self, id: &ProductId) {
        self.state.write().await.products.remove(id);
    }

    /// Configures lookups to fail as if the service were down.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }

    /// Delays every lookup by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// Returns how many batch lookups have been served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalogGateway {
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, GatewayError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().await;
        if state.fail_on_lookup {
            return Err(GatewayError::Unavailable("catalog service down".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}
