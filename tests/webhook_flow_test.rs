//! End-to-end flow: order creation, webhook reconciliation, record queries.
//!
//! Drives the real handlers over an in-memory store, with only the payment
//! provider stubbed out.

use async_trait::async_trait;
use axum::{
    body::Body,
    routing::{get, post},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use checkout_backend::api::orders::{create_order, OrdersState};
use checkout_backend::api::payments::{
    get_payment_by_capture, get_payment_by_order, PaymentsState,
};
use checkout_backend::api::webhooks::{handle_paypal_webhook, WebhookState};
use checkout_backend::database::store::RecordMutator;
use checkout_backend::database::{DatabaseError, InMemoryPaymentStore, PaymentStore};
use checkout_backend::payments::error::PaymentResult;
use checkout_backend::payments::provider::OrderProvider;
use checkout_backend::payments::types::{OrderRequest, OrderResponse, PaymentRecord};
use checkout_backend::services::Reconciler;

struct FixedOrderProvider;

#[async_trait]
impl OrderProvider for FixedOrderProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn create_order(&self, _request: OrderRequest) -> PaymentResult<OrderResponse> {
        Ok(OrderResponse {
            order_id: "PP-1".to_string(),
            status: "CREATED".to_string(),
        })
    }
}

/// Store whose upsert never completes, for exercising the reconcile budget.
struct StallingStore;

#[async_trait]
impl PaymentStore for StallingStore {
    async fn create(&self, record: PaymentRecord) -> Result<PaymentRecord, DatabaseError> {
        Ok(record)
    }

    async fn upsert(
        &self,
        _capture_id: &str,
        _order_id: Option<&str>,
        _mutate: RecordMutator<'_>,
    ) -> Result<PaymentRecord, DatabaseError> {
        std::future::pending().await
    }

    async fn find_by_order_id(
        &self,
        _order_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(None)
    }

    async fn find_by_capture_id(
        &self,
        _capture_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(None)
    }
}

fn build_app() -> (Router, InMemoryPaymentStore) {
    let store = InMemoryPaymentStore::new();
    let shared: Arc<dyn PaymentStore> = Arc::new(store.clone());
    let reconciler = Arc::new(Reconciler::new(shared.clone()));

    let orders_routes = Router::new()
        .route("/api/orders", post(create_order))
        .with_state(OrdersState {
            provider: Arc::new(FixedOrderProvider),
            store: shared.clone(),
        });

    let payments_routes = Router::new()
        .route("/api/payments/{order_id}", get(get_payment_by_order))
        .route("/api/captures/{capture_id}", get(get_payment_by_capture))
        .with_state(PaymentsState { store: shared });

    let webhook_routes = Router::new()
        .route("/webhooks/paypal", post(handle_paypal_webhook))
        .with_state(Arc::new(WebhookState {
            reconciler,
            store_timeout: Duration::from_secs(5),
        }));

    let app = orders_routes.merge(payments_routes).merge(webhook_routes);
    (app, store)
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get_uri(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: http::Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn capture_event(event_type: &str, capture_id: &str, order_id: Option<&str>) -> Value {
    let mut resource = json!({"id": capture_id});
    if let Some(order_id) = order_id {
        resource["supplementary_data"] = json!({"related_ids": {"order_id": order_id}});
    }
    json!({"event_type": event_type, "resource": resource})
}

async fn create_order_via_api(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/orders",
            &json!({
                "amount": 19.999,
                "currency": "usd",
                "productName": "Hoodie",
                "email": "session@shop.example"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_payment_lifecycle() {
    let (app, _store) = build_app();

    let order_id = create_order_via_api(&app).await;
    assert_eq!(order_id, "PP-1");

    // Freshly created record is pending, normalized, unclaimed.
    let response = app
        .clone()
        .oneshot(get_uri("/api/payments/PP-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = read_json(response).await;
    assert_eq!(record["status"], "PENDING");
    assert_eq!(record["amount"]["value"], "20.00");
    assert_eq!(record["amount"]["currency"], "USD");
    assert_eq!(record["sessionEmail"], "session@shop.example");
    assert!(record["captureId"].is_null());

    // Completed capture claims the record through the order correlation.
    let mut completed = capture_event("PAYMENT.CAPTURE.COMPLETED", "CAP-1", Some("PP-1"));
    completed["resource"]["payer"] = json!({"email_address": "buyer@example.com"});
    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paypal", &completed))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = read_json(response).await;
    assert_eq!(ack["received"], true);
    assert_eq!(ack["status"], "applied");

    let response = app
        .clone()
        .oneshot(get_uri("/api/captures/CAP-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = read_json(response).await;
    assert_eq!(record["status"], "COMPLETED");
    assert_eq!(record["captureId"], "CAP-1");
    assert_eq!(record["payerEmail"], "buyer@example.com");
    assert_eq!(record["rawEvents"].as_array().unwrap().len(), 1);

    // Redelivery changes nothing except the audit trail.
    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paypal", &completed))
        .await
        .unwrap();
    assert_eq!(read_json(response).await["status"], "applied");
    let record = read_json(
        app.clone()
            .oneshot(get_uri("/api/captures/CAP-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(record["status"], "COMPLETED");
    assert_eq!(record["rawEvents"].as_array().unwrap().len(), 2);

    // Refund flips status and sets the sticky flag plus refund details.
    let mut refunded = capture_event("PAYMENT.CAPTURE.REFUNDED", "CAP-1", None);
    refunded["resource"]["amount"] = json!({"currency_code": "USD", "value": "20.00"});
    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paypal", &refunded))
        .await
        .unwrap();
    assert_eq!(read_json(response).await["status"], "applied");

    let record = read_json(
        app.clone()
            .oneshot(get_uri("/api/payments/PP-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(record["status"], "REFUNDED");
    assert_eq!(record["refunded"], true);
    assert_eq!(record["refund"]["refundId"], "CAP-1");
    assert_eq!(record["refund"]["amount"]["value"], "20.00");

    // A stale PENDING arriving after the refund still wins the status
    // field, but the refunded flag never clears.
    let pending = capture_event("PAYMENT.CAPTURE.PENDING", "CAP-1", None);
    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paypal", &pending))
        .await
        .unwrap();
    assert_eq!(read_json(response).await["status"], "applied");

    let record = read_json(
        app.clone()
            .oneshot(get_uri("/api/payments/PP-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(record["status"], "PENDING");
    assert_eq!(record["refunded"], true);
    assert_eq!(record["payerEmail"], "buyer@example.com");
    assert_eq!(record["rawEvents"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_unknown_capture_is_acknowledged_but_not_created() {
    let (app, store) = build_app();
    create_order_via_api(&app).await;

    let event = capture_event("PAYMENT.CAPTURE.COMPLETED", "CAP-404", None);
    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paypal", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = read_json(response).await;
    assert_eq!(ack["received"], true);
    assert_eq!(ack["status"], "unmatched");

    assert_eq!(store.len().await, 1);
    let response = app.oneshot(get_uri("/api/captures/CAP-404")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmapped_event_type_is_ignored_but_audited() {
    let (app, _store) = build_app();
    create_order_via_api(&app).await;

    let claim = capture_event("PAYMENT.CAPTURE.COMPLETED", "CAP-1", Some("PP-1"));
    app.clone()
        .oneshot(post_json("/webhooks/paypal", &claim))
        .await
        .unwrap();

    let odd = capture_event("PAYMENT.CAPTURE.REVERSED", "CAP-1", None);
    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paypal", &odd))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ignored");

    let record = read_json(
        app.clone()
            .oneshot(get_uri("/api/captures/CAP-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(record["status"], "COMPLETED");
    assert_eq!(record["rawEvents"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_webhook_body_is_rejected() {
    let (app, _store) = build_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/paypal")
                .header("content-type", "application/json")
                .body(Body::from("{broken"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_webhook_without_resource_id_is_rejected() {
    let (app, _store) = build_app();

    for payload in [
        json!({"event_type": "PAYMENT.CAPTURE.COMPLETED", "resource": {}}),
        json!({"event_type": "PAYMENT.CAPTURE.COMPLETED", "resource": {"id": "  "}}),
        json!({"event_type": "SOMETHING.ELSE"}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/webhooks/paypal", &payload))
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload {payload} should be rejected"
        );
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("resource id"));
    }
}

#[tokio::test]
async fn test_store_timeout_maps_to_server_error_so_provider_retries() {
    let reconciler = Arc::new(Reconciler::new(Arc::new(StallingStore)));
    let app = Router::new()
        .route("/webhooks/paypal", post(handle_paypal_webhook))
        .with_state(Arc::new(WebhookState {
            reconciler,
            store_timeout: Duration::from_millis(50),
        }));

    let event = capture_event("PAYMENT.CAPTURE.COMPLETED", "CAP-1", Some("PP-1"));
    let response = app
        .oneshot(post_json("/webhooks/paypal", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Failed to process webhook");
    assert_eq!(body["details"], "Payment storage did not respond in time");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_query_endpoints_404_for_unknown_ids() {
    let (app, _store) = build_app();

    let response = app
        .clone()
        .oneshot(get_uri("/api/payments/UNKNOWN"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        read_json(response).await["error"],
        "Payment record not found"
    );

    let response = app.oneshot(get_uri("/api/captures/UNKNOWN")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
