//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::money::Money;

/// A request or order that violates the order invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The order has no lines.
    #[error("Order must contain at least one line")]
    NoLines,

    /// A line asked for zero units, or more than [`MAX_QUANTITY`](crate::order::MAX_QUANTITY).
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// The same product appears on more than one line.
    #[error("Product {0} appears more than once")]
    DuplicateProduct(ProductId),

    /// A resolved price is negative.
    #[error("Invalid price {price} for product {product_id}")]
    InvalidPrice { product_id: ProductId, price: Money },

    /// A line total or the order total does not fit in a decimal.
    #[error("Amount overflow computing total for product {0}")]
    AmountOverflow(ProductId),

    /// The computed total is zero or negative.
    #[error("Order total must be positive, got {0}")]
    NonPositiveTotal(Money),
}

/// Errors that can occur while reading or writing orders.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned back into an order.
    #[error("Corrupt order record: {0}")]
    Corrupt(String),

    /// The store refused the operation.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
