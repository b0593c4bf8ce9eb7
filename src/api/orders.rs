//! POST /api/orders: validate the cart, create the provider order and
//! persist the pending payment record.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::store::PaymentStore;
use crate::middleware::error::{client_error, payment_error_response};
use crate::payments::amount::validate_order_amount;
use crate::payments::error::PaymentError;
use crate::payments::provider::OrderProvider;
use crate::payments::types::{OrderRequest, PaymentRecord};

#[derive(Clone)]
pub struct OrdersState {
    pub provider: Arc<dyn OrderProvider>,
    pub store: Arc<dyn PaymentStore>,
}

/// Checkout payload from the storefront. `amount` and `price` are aliases;
/// `amount` wins when both are present. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody {
    amount: Option<JsonValue>,
    price: Option<JsonValue>,
    currency: Option<String>,
    product_name: Option<String>,
    original_total: Option<JsonValue>,
    original_currency: Option<String>,
    email: Option<String>,
    reference_id: Option<String>,
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<OrdersState>,
    body: String,
) -> Response {
    let payload: JsonValue = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Order request body is not valid JSON");
            return client_error(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };
    let request: CreateOrderBody = match serde_json::from_value(payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Order request body has wrong shape");
            return client_error(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let raw_amount = match request.amount.or(request.price) {
        Some(raw) => raw,
        None => return client_error(StatusCode::BAD_REQUEST, "amount is required"),
    };
    let currency = request.currency.unwrap_or_default();

    let product_name = match request
        .product_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        Some(name) => name.to_string(),
        None => return client_error(StatusCode::BAD_REQUEST, "productName is required"),
    };

    let amount = match validate_order_amount(&raw_amount, &currency) {
        Ok(money) => money,
        Err(error) => return client_error(StatusCode::BAD_REQUEST, error.user_message()),
    };

    let reference_id = request
        .reference_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("order-{}", Utc::now().timestamp_millis()));
    let session_email = request.email.filter(|email| !email.trim().is_empty());

    let order_request = OrderRequest {
        amount: amount.clone(),
        product_name,
        original_total: request.original_total.as_ref().and_then(stringify),
        original_currency: request
            .original_currency
            .filter(|currency| !currency.trim().is_empty()),
        reference_id: reference_id.clone(),
    };

    let order = match state.provider.create_order(order_request).await {
        Ok(order) => order,
        Err(error) => return payment_error_response("Failed to create payment order", &error),
    };

    let record = PaymentRecord::new(&order.order_id, &reference_id, amount, session_email);
    if let Err(error) = state.store.create(record).await {
        return payment_error_response(
            "Failed to persist payment order",
            &PaymentError::from(error),
        );
    }

    info!(
        order_id = %order.order_id,
        reference_id = %reference_id,
        provider = %state.provider.name(),
        "Payment order created"
    );

    (
        StatusCode::CREATED,
        Json(json!({"id": order.order_id, "status": order.status})),
    )
        .into_response()
}

/// Renders a JSON scalar the way the storefront sent it, for the order
/// description. Non-scalar values are dropped.
fn stringify(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(&json!("25000")), Some("25000".to_string()));
        assert_eq!(stringify(&json!(25000)), Some("25000".to_string()));
        assert_eq!(stringify(&json!(19.5)), Some("19.5".to_string()));
        assert_eq!(stringify(&json!("")), None);
        assert_eq!(stringify(&json!({"nested": 1})), None);
        assert_eq!(stringify(&json!(null)), None);
    }

    #[test]
    fn test_body_accepts_amount_or_price() {
        let body: CreateOrderBody =
            serde_json::from_value(json!({"amount": "19.99", "currency": "USD"})).unwrap();
        assert!(body.amount.is_some());
        assert!(body.price.is_none());

        let body: CreateOrderBody =
            serde_json::from_value(json!({"price": 19.99, "currency": "USD"})).unwrap();
        assert!(body.price.is_some());
    }

    #[test]
    fn test_body_ignores_unknown_fields() {
        let body: CreateOrderBody = serde_json::from_value(json!({
            "amount": "5",
            "currency": "USD",
            "productName": "Sticker",
            "exchangeRate": 950.25,
            "cartId": "abc"
        }))
        .unwrap();
        assert_eq!(body.product_name.as_deref(), Some("Sticker"));
    }
}
