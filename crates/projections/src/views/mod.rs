//! Read model views.

pub mod account_directory;
pub mod account_orders;

pub use account_directory::{AccountDirectoryView, AccountEntry};
pub use account_orders::{AccountOrdersSummary, AccountOrdersView};
