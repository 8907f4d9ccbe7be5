//! Order orchestrator: the create-order saga and order queries.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{AccountId, ProductId};
use domain::{
    Order, OrderDetails, OrderLineRequest, OrderStore, OrderedLine, Pagination, Product,
    StoreError, validate_request,
};
use event_channel::{DomainEvent, EventChannel, EventEnvelope, ORDER_EVENTS_TOPIC};
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, OrderSagaError, Result};
use crate::services::{AccountGateway, CatalogGateway};
use crate::state::OrderStage;

/// Default bound on the account and catalog lookups.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunables for [`OrderOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Shared deadline for the concurrent enrichment lookups.
    pub lookup_timeout: Duration,
    /// Topic `order.created` events are published on.
    pub topic: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            topic: ORDER_EVENTS_TOPIC.to_string(),
        }
    }
}

/// A successfully created order and how its announcement went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    /// Either [`OrderStage::Published`] or [`OrderStage::PublishDegraded`].
    pub stage: OrderStage,
}

impl PlacedOrder {
    /// Returns true if the order was stored but its event was not delivered.
    pub fn is_delivery_degraded(&self) -> bool {
        self.stage == OrderStage::PublishDegraded
    }
}

/// Assembles orders from the account and catalog services, stores them,
/// and announces them on the event channel.
///
/// Prices are taken from the catalog at creation time and frozen into the
/// stored order. Persistence always precedes the announcement, and a failed
/// announcement never undoes a stored order.
pub struct OrderOrchestrator<S, A, C>
where
    S: OrderStore,
    A: AccountGateway,
    C: CatalogGateway,
{
    store: S,
    accounts: A,
    catalog: C,
    channel: Arc<dyn EventChannel>,
    config: OrchestratorConfig,
}

impl<S, A, C> OrderOrchestrator<S, A, C>
where
    S: OrderStore + Clone + 'static,
    A: AccountGateway,
    C: CatalogGateway,
{
    /// Creates an orchestrator with the default configuration.
    pub fn new(store: S, accounts: A, catalog: C, channel: Arc<dyn EventChannel>) -> Self {
        Self {
            store,
            accounts,
            catalog,
            channel,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Creates an order for `account_id` from the requested lines.
    ///
    /// Cancelling `cancel` aborts the account and catalog lookups. Once the
    /// order is being persisted the call runs to completion regardless, even
    /// if the returned future is dropped.
    #[tracing::instrument(skip(self, lines, cancel), fields(%account_id, lines = lines.len()))]
    pub async fn create_order(
        &self,
        account_id: AccountId,
        lines: Vec<OrderLineRequest>,
        cancel: &CancellationToken,
    ) -> Result<PlacedOrder> {
        let start = Instant::now();
        let result = self.run_create_order(account_id, lines, cancel).await;
        metrics::histogram!("create_order_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %placed.order.id,
                    total_price = %placed.order.total_price,
                    stage = %placed.stage,
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                tracing::warn!(error = %e, "order rejected");
            }
        }
        result
    }

    async fn run_create_order(
        &self,
        account_id: AccountId,
        lines: Vec<OrderLineRequest>,
        cancel: &CancellationToken,
    ) -> Result<PlacedOrder> {
        let mut stage = OrderStage::Validating;
        validate_request(&lines)?;

        advance(&mut stage, OrderStage::Enriching);
        let product_ids: Vec<ProductId> = lines.iter().map(|l| l.product_id.clone()).collect();
        let products = self.lookup(&account_id, &product_ids, cancel).await?;

        let mut missing: Vec<ProductId> = product_ids
            .iter()
            .filter(|id| !products.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(OrderSagaError::ProductNotFound(missing));
        }

        let ordered = lines
            .into_iter()
            .filter_map(|line| {
                products
                    .get(&line.product_id)
                    .map(|product| OrderedLine::new(line.product_id, line.quantity, product.price))
            })
            .collect();
        let order = Order::new(account_id, ordered)?;

        advance(&mut stage, OrderStage::Persisting);
        let store = self.store.clone();
        let channel = Arc::clone(&self.channel);
        let topic = self.config.topic.clone();
        let committed = order.clone();
        // Spawned so the caller dropping this future cannot interrupt it.
        let outcome = tokio::spawn(async move {
            persist_and_publish(store, channel, &topic, committed).await
        })
        .await
        .map_err(|e| OrderSagaError::Storage(StoreError::Unavailable(e.to_string())))?;

        match outcome {
            Ok(next) => {
                advance(&mut stage, next);
                Ok(PlacedOrder { order, stage })
            }
            Err(e) => {
                advance(&mut stage, OrderStage::PersistFailed);
                Err(OrderSagaError::Storage(e))
            }
        }
    }

    /// Runs the account and catalog lookups concurrently under one deadline.
    ///
    /// Resolves to the catalog entries once the account is known to exist.
    async fn lookup(
        &self,
        account_id: &AccountId,
        product_ids: &[ProductId],
        cancel: &CancellationToken,
    ) -> Result<HashMap<ProductId, Product>> {
        let both = async {
            tokio::join!(
                self.accounts.get_account(account_id),
                self.catalog.get_products(product_ids)
            )
        };

        let (account, products) = tokio::select! {
            () = cancel.cancelled() => return Err(OrderSagaError::Cancelled),
            joined = tokio::time::timeout(self.config.lookup_timeout, both) => {
                joined.map_err(|_| OrderSagaError::DependencyTimeout(self.config.lookup_timeout))?
            }
        };

        let account = account
            .map_err(|source| OrderSagaError::DependencyUnavailable {
                dependency: "account",
                source,
            })?
            .ok_or_else(|| OrderSagaError::AccountNotFound(account_id.clone()))?;
        if account.id != *account_id {
            return Err(OrderSagaError::DependencyUnavailable {
                dependency: "account",
                source: GatewayError::UnexpectedResponse(format!(
                    "asked for account {account_id}, got {}",
                    account.id
                )),
            });
        }

        let products = products
            .map_err(|source| OrderSagaError::DependencyUnavailable {
                dependency: "catalog",
                source,
            })?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(products)
    }

    /// Lists an account's orders with current catalog metadata attached.
    ///
    /// Stored prices and totals are returned as-is. If the catalog cannot be
    /// reached, or some products are gone, the affected lines simply carry
    /// no metadata.
    #[tracing::instrument(skip(self), fields(%account_id))]
    pub async fn get_orders_for_account(
        &self,
        account_id: &AccountId,
        page: Pagination,
    ) -> Result<Vec<OrderDetails>> {
        let orders = self.store.list_for_account(account_id, page).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = orders
            .iter()
            .flat_map(|order| order.product_ids())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let catalog = match tokio::time::timeout(
            self.config.lookup_timeout,
            self.catalog.get_products(&ids),
        )
        .await
        {
            Ok(Ok(products)) => products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "catalog lookup failed, returning orders without product details");
                HashMap::new()
            }
            Err(_) => {
                tracing::warn!("catalog lookup timed out, returning orders without product details");
                HashMap::new()
            }
        };

        Ok(orders
            .into_iter()
            .map(|order| OrderDetails::enrich(order, &catalog))
            .collect())
    }
}

/// Stores the order, then announces it. Only a storage failure is an error.
async fn persist_and_publish<S: OrderStore>(
    store: S,
    channel: Arc<dyn EventChannel>,
    topic: &str,
    order: Order,
) -> std::result::Result<OrderStage, StoreError> {
    store.insert(&order).await?;

    let envelope = EventEnvelope::new(DomainEvent::order_created(&order));
    match channel
        .publish(topic, order.account_id.as_str(), &envelope)
        .await
    {
        Ok(()) => Ok(OrderStage::Published),
        Err(e) => {
            metrics::counter!("order_events_publish_degraded_total").increment(1);
            tracing::warn!(
                error = %e,
                order_id = %order.id,
                event_id = %envelope.event_id,
                "order stored but order.created was not published"
            );
            Ok(OrderStage::PublishDegraded)
        }
    }
}

fn advance(stage: &mut OrderStage, next: OrderStage) {
    debug_assert!(
        stage.can_transition_to(next),
        "invalid stage transition {stage} -> {next}"
    );
    tracing::debug!(from = %stage, to = %next, "order stage");
    *stage = next;
}
