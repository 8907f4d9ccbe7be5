//! Accounts as seen by the order service.

use common::AccountId;
use serde::{Deserialize, Serialize};

/// An account owned by the account service.
///
/// The order service only ever reads accounts; it never stores or mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
