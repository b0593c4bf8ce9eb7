//! POST /webhooks/paypal: receive provider events and reconcile them.
//!
//! The provider retries until it sees 200, so every handled outcome
//! acknowledges. Only two cases refuse: a body the normalizer cannot use
//! (400, a retry would fail identically) and a store failure (500, a retry
//! is exactly what we want).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::middleware::error::{client_error, payment_error_response, server_error};
use crate::payments::events;
use crate::services::Reconciler;

pub struct WebhookState {
    pub reconciler: Arc<Reconciler>,
    /// Upper bound on one reconcile pass against the store.
    pub store_timeout: Duration,
}

/// POST /webhooks/paypal
pub async fn handle_paypal_webhook(
    State(state): State<Arc<WebhookState>>,
    body: String,
) -> Response {
    let payload: JsonValue = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Webhook payload is not valid JSON");
            return client_error(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let event = match events::normalize(&payload) {
        Ok(event) => event,
        Err(error) => {
            warn!(error = %error, "Webhook payload has no usable resource id");
            return client_error(StatusCode::BAD_REQUEST, error.user_message());
        }
    };

    info!(
        capture_id = %event.capture_id,
        event_type = %event.event_type,
        "Received provider webhook"
    );

    match timeout(state.store_timeout, state.reconciler.apply(event)).await {
        Ok(Ok(outcome)) => (
            StatusCode::OK,
            Json(json!({"received": true, "status": outcome.as_str()})),
        )
            .into_response(),
        Ok(Err(error)) => payment_error_response("Failed to process webhook", &error),
        Err(_) => {
            error!(
                timeout_secs = state.store_timeout.as_secs(),
                "Webhook reconciliation timed out against the store"
            );
            server_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process webhook",
                "Payment storage did not respond in time",
            )
        }
    }
}
