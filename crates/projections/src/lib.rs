//! Read models built from the event channel.
//!
//! This crate provides the consuming side of the order service's events:
//! - [`Projection`] trait for folding events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`], a channel message handler that fans events out
//! - Two views: per-account order statistics and the account directory

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{AccountDirectoryView, AccountEntry, AccountOrdersSummary, AccountOrdersView};
