//! Shared identifiers and retry helpers used across the order services.

pub mod retry;
pub mod types;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use types::{AccountId, OrderId, ProductId};
