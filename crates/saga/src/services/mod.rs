//! Gateways to the account and catalog services, with in-memory and HTTP adapters.

pub mod account;
pub mod catalog;
pub mod http;

pub use account::{AccountGateway, InMemoryAccountGateway};
pub use catalog::{CatalogGateway, InMemoryCatalogGateway};
pub use http::{HttpAccountGateway, HttpCatalogGateway};
