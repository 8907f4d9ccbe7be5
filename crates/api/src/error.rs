//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::OrderSagaError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The operation is not served by this deployment.
    Unsupported(String),
    /// Order saga error.
    Saga(OrderSagaError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn into_parts(self) -> (StatusCode, serde_json::Value) {
        match self {
            ApiError::NotFound(msg) => plain_error(StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => plain_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unsupported(msg) => {
                plain_error(StatusCode::NOT_IMPLEMENTED, "unsupported", msg)
            }
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                plain_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, axum::Json(body)).into_response()
    }
}

/// Body for errors raised by the API layer itself; these are never retriable.
fn plain_error(status: StatusCode, kind: &str, msg: String) -> (StatusCode, serde_json::Value) {
    (
        status,
        json!({
            "error": msg,
            "kind": kind,
            "retriable": false,
        }),
    )
}

fn saga_error_to_response(err: OrderSagaError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        OrderSagaError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
        OrderSagaError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        OrderSagaError::ProductNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OrderSagaError::DependencyTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        OrderSagaError::DependencyUnavailable { .. } => StatusCode::BAD_GATEWAY,
        OrderSagaError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        OrderSagaError::Storage(_) => {
            tracing::error!(error = %err, "order storage failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let mut body = json!({
        "error": err.to_string(),
        "kind": err.kind(),
        "retriable": err.is_retriable(),
    });
    if let OrderSagaError::ProductNotFound(ids) = &err {
        body["missing_product_ids"] = json!(ids);
    }
    (status, body)
}

impl From<OrderSagaError> for ApiError {
    fn from(err: OrderSagaError) -> Self {
        ApiError::Saga(err)
    }
}
