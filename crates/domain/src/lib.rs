//! Domain layer for the order service.
//!
//! This crate provides:
//! - [`Money`], an exact decimal amount used for prices and totals
//! - [`Account`] and [`Product`], read-only snapshots owned by other services
//! - [`Order`] and [`OrderedLine`], the order service's own records
//! - the [`OrderStore`] port with in-memory and PostgreSQL adapters

pub mod account;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod store;

pub use account::Account;
pub use common::{AccountId, OrderId, ProductId};
pub use error::{DomainError, StoreError};
pub use money::Money;
pub use order::{
    LineDetails, MAX_QUANTITY, Order, OrderDetails, OrderLineRequest, OrderedLine, ProductInfo,
    validate_request,
};
pub use product::Product;
pub use store::{InMemoryOrderStore, OrderStore, Pagination, PostgresOrderStore};
