//! Order saga error types.

use std::time::Duration;

use common::{AccountId, ProductId};
use domain::{DomainError, StoreError};
use thiserror::Error;

/// Errors raised by the account and catalog gateways.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The collaborator is down or refused the request.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Transport or decoding failure talking to a remote service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a status we do not handle.
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The remote service answered with a body that does not fit the request.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The configured service URL cannot carry a request path.
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

/// Errors returned by order creation and order queries.
#[derive(Debug, Error)]
pub enum OrderSagaError {
    /// The request or the assembled order breaks an order rule.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] DomainError),

    /// The account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Some requested products are unknown to the catalog.
    #[error("Products not found: {}", join_ids(.0))]
    ProductNotFound(Vec<ProductId>),

    /// The enrichment lookups did not finish in time.
    #[error("Dependency lookups timed out after {0:?}")]
    DependencyTimeout(Duration),

    /// A collaborator failed for a reason other than not-found.
    #[error("{dependency} service failed: {source}")]
    DependencyUnavailable {
        dependency: &'static str,
        #[source]
        source: GatewayError,
    },

    /// Local persistence failed; no order was created.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The caller went away before the lookups completed.
    #[error("Request cancelled")]
    Cancelled,
}

impl OrderSagaError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderSagaError::InvalidOrder(_) => "invalid_order",
            OrderSagaError::AccountNotFound(_) => "account_not_found",
            OrderSagaError::ProductNotFound(_) => "product_not_found",
            OrderSagaError::DependencyTimeout(_) => "dependency_timeout",
            OrderSagaError::DependencyUnavailable { .. } => "dependency_unavailable",
            OrderSagaError::Storage(_) => "storage",
            OrderSagaError::Cancelled => "cancelled",
        }
    }

    /// Returns true if the caller may safely retry the same request.
    ///
    /// Every failure leaves no side effect behind, so retriability only
    /// depends on whether the cause is transient.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            OrderSagaError::DependencyTimeout(_)
                | OrderSagaError::DependencyUnavailable { .. }
                | OrderSagaError::Storage(_)
        )
    }
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ProductId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, OrderSagaError>;
