//! Order-assembly saga.
//!
//! Creating an order runs these steps:
//! 1. Validate the requested lines
//! 2. Look up the account and the products concurrently, under one deadline
//! 3. Freeze current catalog prices into the order and compute its total
//! 4. Persist the order
//! 5. Publish `order.created`, keyed by account id
//!
//! Steps 1-3 have no side effects, so a failure there leaves nothing to undo.
//! A failed publish in step 5 is logged and reported as degraded delivery;
//! the stored order is never rolled back.

pub mod error;
pub mod orchestrator;
pub mod services;
pub mod state;

pub use error::{GatewayError, OrderSagaError};
pub use orchestrator::{
    DEFAULT_LOOKUP_TIMEOUT, OrchestratorConfig, OrderOrchestrator, PlacedOrder,
};
pub use services::{
    AccountGateway, CatalogGateway, HttpAccountGateway, HttpCatalogGateway,
    InMemoryAccountGateway, InMemoryCatalogGateway,
};
pub use state::OrderStage;
