//! Read endpoints for payment records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::database::store::PaymentStore;
use crate::middleware::error::{client_error, payment_error_response};
use crate::payments::error::PaymentError;

#[derive(Clone)]
pub struct PaymentsState {
    pub store: Arc<dyn PaymentStore>,
}

/// GET /api/payments/{order_id}
pub async fn get_payment_by_order(
    State(state): State<PaymentsState>,
    Path(order_id): Path<String>,
) -> Response {
    match state.store.find_by_order_id(&order_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => client_error(StatusCode::NOT_FOUND, "Payment record not found"),
        Err(error) => payment_error_response(
            "Failed to load payment record",
            &PaymentError::from(error),
        ),
    }
}

/// GET /api/captures/{capture_id}
pub async fn get_payment_by_capture(
    State(state): State<PaymentsState>,
    Path(capture_id): Path<String>,
) -> Response {
    match state.store.find_by_capture_id(&capture_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => client_error(StatusCode::NOT_FOUND, "Payment record not found"),
        Err(error) => payment_error_response(
            "Failed to load payment record",
            &PaymentError::from(error),
        ),
    }
}
