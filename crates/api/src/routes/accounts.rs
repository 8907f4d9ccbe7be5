//! Account registration (in-process accounts only) and account summaries.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AccountId, OrderId};
use domain::{Account, Money, Pagination};
use saga::InMemoryAccountGateway;
use serde::{Deserialize, Serialize};

use super::orders::PageQuery;
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct AccountSummaryResponse {
    pub account_id: AccountId,
    pub name: Option<String>,
    pub order_count: u64,
    pub total_spent: Money,
    pub order_ids: Vec<OrderId>,
    pub last_order_at: DateTime<Utc>,
}

fn local_accounts(state: &AppState) -> Result<&InMemoryAccountGateway, ApiError> {
    state.accounts.local().ok_or_else(|| {
        ApiError::Unsupported("Accounts are managed by the account service".to_string())
    })
}

/// POST /accounts: register an account and announce it.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Account name is required".to_string()));
    }

    let account = local_accounts(&state)?.create_account(name).await;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts: list registered accounts.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let page = Pagination::from(page);
    let accounts = local_accounts(&state)?
        .list_accounts(page.skip as usize, page.take as usize)
        .await;
    Ok(Json(accounts))
}

/// GET /accounts/{id}/summary: order statistics from the event-fed read model.
///
/// Eventually consistent with order creation.
#[tracing::instrument(skip(state))]
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AccountSummaryResponse>, ApiError> {
    let account_id = AccountId::new(id);
    let summary = state
        .account_orders
        .get_account(&account_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No orders recorded for account {account_id}")))?;
    let name = state
        .account_directory
        .get(&account_id)
        .await
        .map(|entry| entry.name);

    Ok(Json(AccountSummaryResponse {
        account_id: summary.account_id,
        name,
        order_count: summary.order_count,
        total_spent: summary.total_spent,
        order_ids: summary.order_ids,
        last_order_at: summary.last_order_at,
    }))
}
