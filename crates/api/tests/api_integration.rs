//! Integration tests for the order service HTTP API.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::LocalServices;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::{Account, Money, Product};
use event_channel::{ACCOUNT_EVENTS_TOPIC, ORDER_EVENTS_TOPIC};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (axum::Router, Arc<api::AppState>, LocalServices) {
    let (state, local) = api::create_default_state();

    local.accounts.insert(Account::new("acc-1", "Ada")).await;
    local
        .catalog
        .upsert(Product::new("A", "Widget", "A small widget", Money::new(dec!(9.99))))
        .await;
    local
        .catalog
        .upsert(Product::new("B", "Gadget", "A large gadget", Money::new(dec!(5.00))))
        .await;

    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state, local)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn standard_order(account: &str) -> Value {
    json!({
        "account_id": account,
        "lines": [
            {"product_id": "A", "quantity": 2},
            {"product_id": "B", "quantity": 1}
        ]
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["accounts"], "local");
}

#[tokio::test]
async fn test_create_order() {
    let (app, _, local) = setup().await;

    let (status, json) = send(&app, post_json("/orders", standard_order("acc-1"))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["account_id"], "acc-1");
    assert_eq!(json["total_price"], "24.98");
    assert_eq!(json["delivery"], "Published");
    assert_eq!(json["lines"][0]["price"], "9.99");
    assert!(json["id"].as_str().is_some());

    let messages = local.channel.messages(ORDER_EVENTS_TOPIC).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].key.as_deref(), Some("acc-1"));
}

#[tokio::test]
async fn test_create_and_list_orders_for_account() {
    let (app, _, local) = setup().await;
    send(&app, post_json("/orders", standard_order("acc-1"))).await;

    local
        .catalog
        .set_price(&"A".into(), Money::new(dec!(12.99)))
        .await;

    let (status, json) = send(&app, get("/accounts/acc-1/orders")).await;

    assert_eq!(status, StatusCode::OK);
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["total_price"], "24.98");
    assert_eq!(orders[0]["lines"][0]["price"], "9.99");
    assert_eq!(orders[0]["lines"][0]["product"]["name"], "Widget");
}

#[tokio::test]
async fn test_list_orders_respects_pagination() {
    let (app, _, _) = setup().await;
    for _ in 0..3 {
        send(&app, post_json("/orders", standard_order("acc-1"))).await;
    }

    let (_, json) = send(&app, get("/accounts/acc-1/orders?skip=1&take=1")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(&app, get("/accounts/acc-1/orders?skip=2")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_account_is_not_found() {
    let (app, _, local) = setup().await;

    let (status, json) = send(&app, post_json("/orders", standard_order("ghost"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "account_not_found");
    assert_eq!(local.store.order_count().await, 0);
}

#[tokio::test]
async fn test_missing_product_is_unprocessable() {
    let (app, _, local) = setup().await;
    local.catalog.remove(&"B".into()).await;

    let (status, json) = send(&app, post_json("/orders", standard_order("acc-1"))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["missing_product_ids"], json!(["B"]));
}

#[tokio::test]
async fn test_invalid_lines_are_bad_request() {
    let (app, _, _) = setup().await;

    let (status, _) = send(
        &app,
        post_json("/orders", json!({"account_id": "acc-1", "lines": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/orders",
            json!({"account_id": "acc-1", "lines": [{"product_id": "A", "quantity": 0}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        post_json(
            "/orders",
            json!({"account_id": "acc-1", "lines": [{"product_id": "A", "quantity": -3}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
    assert_eq!(json["retriable"], false);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_quantity_beyond_storage_range_is_bad_request() {
    let (app, _, local) = setup().await;

    let (status, json) = send(
        &app,
        post_json(
            "/orders",
            json!({"account_id": "acc-1", "lines": [{"product_id": "A", "quantity": 3_000_000_000u64}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_order");
    assert_eq!(json["retriable"], false);
    assert_eq!(local.store.order_count().await, 0);
}

#[tokio::test]
async fn test_publish_failure_still_creates_order() {
    let (app, _, local) = setup().await;
    local.channel.set_fail_on_publish(true).await;

    let (status, json) = send(&app, post_json("/orders", standard_order("acc-1"))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["delivery"], "PublishDegraded");
    assert_eq!(local.store.order_count().await, 1);
}

#[tokio::test]
async fn test_create_and_list_accounts() {
    let (app, _, local) = setup().await;

    let (status, json) = send(&app, post_json("/accounts", json!({"name": "Grace"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "Grace");

    let events = local.channel.published(ACCOUNT_EVENTS_TOPIC).await.unwrap();
    assert_eq!(events.len(), 1);

    let (status, json) = send(&app, get("/accounts?skip=0&take=10")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);
}

#[tokio::test]
async fn test_blank_account_name_is_rejected() {
    let (app, _, _) = setup().await;

    let (status, _) = send(&app, post_json("/accounts", json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_summary_follows_events() {
    let (app, state, local) = setup().await;
    let shutdown = CancellationToken::new();
    let subscriptions = api::spawn_projections(
        &state,
        Arc::new(local.channel.clone()),
        "test",
        shutdown.clone(),
    );

    let (_, created) = send(&app, post_json("/accounts", json!({"name": "Grace"}))).await;
    let account_id = created["id"].as_str().unwrap().to_string();
    send(&app, post_json("/orders", standard_order(&account_id))).await;
    send(&app, post_json("/orders", standard_order(&account_id))).await;

    let uri = format!("/accounts/{account_id}/summary");
    let mut summary = Value::Null;
    for _ in 0..200 {
        let (status, json) = send(&app, get(&uri)).await;
        if status == StatusCode::OK && json["order_count"] == 2 && json["name"] == "Grace" {
            summary = json;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(summary["order_count"], 2);
    assert_eq!(summary["total_spent"], "49.96");
    assert_eq!(summary["name"], "Grace");

    shutdown.cancel();
    for subscription in subscriptions {
        subscription.await.unwrap();
    }
}

#[tokio::test]
async fn test_summary_for_unknown_account_is_not_found() {
    let (app, _, _) = setup().await;

    let (status, json) = send(&app, get("/accounts/nobody/summary")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
    assert_eq!(json["retriable"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup().await;
    send(&app, post_json("/orders", standard_order("acc-1"))).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
