//! Order creation and per-account order listing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::AccountId;
use domain::{Order, OrderDetails, OrderLineRequest, Pagination};
use saga::{OrderStage, PlacedOrder};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub account_id: String,
    pub lines: Vec<OrderLineBody>,
}

#[derive(Deserialize)]
pub struct OrderLineBody {
    pub product_id: String,
    /// Signed so a negative quantity is reported as such, not as a parse error.
    pub quantity: i64,
}

impl TryFrom<OrderLineBody> for OrderLineRequest {
    type Error = ApiError;

    fn try_from(body: OrderLineBody) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(body.quantity).map_err(|_| {
            ApiError::BadRequest(format!(
                "Invalid quantity {} for product {}",
                body.quantity, body.product_id
            ))
        })?;
        Ok(OrderLineRequest::new(body.product_id, quantity))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        let default = Pagination::default();
        Pagination::new(
            query.skip.unwrap_or(default.skip),
            query.take.unwrap_or(default.take),
        )
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    #[serde(flatten)]
    pub order: Order,
    /// Delivery status of the `order.created` event.
    pub delivery: OrderStage,
}

impl From<PlacedOrder> for OrderCreatedResponse {
    fn from(placed: PlacedOrder) -> Self {
        Self {
            order: placed.order,
            delivery: placed.stage,
        }
    }
}

// -- Handlers --

/// POST /orders: assemble, store and announce a new order.
///
/// If the client disconnects while the account and catalog lookups are in
/// flight, they are cancelled. Once persisting has begun the order is
/// completed regardless.
#[tracing::instrument(skip(state, req), fields(account_id = %req.account_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let lines = req
        .lines
        .into_iter()
        .map(OrderLineRequest::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let placed = state
        .orchestrator
        .create_order(AccountId::new(req.account_id), lines, &cancel)
        .await?;

    Ok((StatusCode::CREATED, Json(placed.into())))
}

/// GET /accounts/{id}/orders: an account's orders with current product details.
#[tracing::instrument(skip(state))]
pub async fn list_for_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    let orders = state
        .orchestrator
        .get_orders_for_account(&AccountId::new(id), page.into())
        .await?;
    Ok(Json(orders))
}
