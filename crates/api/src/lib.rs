//! HTTP order service with observability.
//!
//! Provides REST endpoints for creating and listing orders and, when
//! accounts are served in-process, for registering accounts. Structured
//! logging goes through tracing and metrics are exported for Prometheus.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{InMemoryOrderStore, OrderStore};
use event_channel::{
    ACCOUNT_EVENTS_TOPIC, EventChannel, InMemoryEventChannel, MessageHandler, ORDER_EVENTS_TOPIC,
    subscribe,
};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{AccountDirectoryView, AccountOrdersView, ProjectionProcessor};
use saga::{
    AccountGateway, CatalogGateway, InMemoryAccountGateway, InMemoryCatalogGateway,
    OrchestratorConfig, OrderOrchestrator,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bootstrap::{AccountBackend, Infrastructure};

/// The orchestrator as wired by the service, over type-erased adapters.
pub type Orchestrator =
    OrderOrchestrator<Arc<dyn OrderStore>, Arc<dyn AccountGateway>, Arc<dyn CatalogGateway>>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub accounts: AccountBackend,
    pub account_orders: AccountOrdersView,
    pub account_directory: AccountDirectoryView,
}

impl AppState {
    /// Wires the orchestrator and empty read models over `infra`.
    pub fn new(infra: &Infrastructure, config: OrchestratorConfig) -> Self {
        let orchestrator = OrderOrchestrator::new(
            Arc::clone(&infra.store),
            infra.accounts.gateway(),
            Arc::clone(&infra.catalog),
            Arc::clone(&infra.channel),
        )
        .with_config(config);

        Self {
            orchestrator,
            accounts: infra.accounts.clone(),
            account_orders: AccountOrdersView::new(),
            account_directory: AccountDirectoryView::new(),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/accounts", post(routes::accounts::create))
        .route("/accounts", get(routes::accounts::list))
        .route("/accounts/{id}/orders", get(routes::orders::list_for_account))
        .route("/accounts/{id}/summary", get(routes::accounts::summary))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// In-process adapters behind a default state, exposed for seeding.
#[derive(Clone)]
pub struct LocalServices {
    pub store: InMemoryOrderStore,
    pub channel: InMemoryEventChannel,
    pub accounts: InMemoryAccountGateway,
    pub catalog: InMemoryCatalogGateway,
}

/// Creates an application state that runs entirely in memory.
pub fn create_default_state() -> (Arc<AppState>, LocalServices) {
    let channel = InMemoryEventChannel::new();
    let shared: Arc<dyn EventChannel> = Arc::new(channel.clone());
    let local = LocalServices {
        store: InMemoryOrderStore::new(),
        accounts: InMemoryAccountGateway::with_channel(Arc::clone(&shared)),
        catalog: InMemoryCatalogGateway::new(),
        channel,
    };

    let infra = Infrastructure {
        store: Arc::new(local.store.clone()),
        channel: shared,
        accounts: AccountBackend::Local(local.accounts.clone()),
        catalog: Arc::new(local.catalog.clone()),
    };
    let state = Arc::new(AppState::new(&infra, OrchestratorConfig::default()));
    (state, local)
}

/// Subscribes the in-process read models to order and account events.
///
/// Each topic gets its own subscription under `{group}-projections`; all of
/// them stop when `shutdown` is cancelled.
pub fn spawn_projections(
    state: &AppState,
    channel: Arc<dyn EventChannel>,
    group: &str,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut processor = ProjectionProcessor::new();
    processor.register(Arc::new(state.account_orders.clone()));
    processor.register(Arc::new(state.account_directory.clone()));
    let handler: Arc<dyn MessageHandler> = Arc::new(processor);
    let group = format!("{group}-projections");

    [ORDER_EVENTS_TOPIC, ACCOUNT_EVENTS_TOPIC]
        .into_iter()
        .map(|topic| {
            let channel = Arc::clone(&channel);
            let handler = Arc::clone(&handler);
            let group = group.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = subscribe(&channel, topic, &group, handler, shutdown).await {
                    tracing::error!(error = %e, %topic, "projection subscription failed");
                }
            })
        })
        .collect()
}
