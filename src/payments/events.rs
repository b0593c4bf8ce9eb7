//! Normalization of raw provider webhook payloads into [`StatusEvent`]s.
//!
//! The provider delivers events at least once and in no guaranteed order,
//! so this stage stays pure: it extracts identifiers and the mapped status
//! and leaves every durability decision to the reconciler.

use serde_json::Value as JsonValue;

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{Money, PaymentStatus, RefundInfo, StatusEvent};

/// Payer email field candidates, checked in order on the event payer object.
const PAYER_EMAIL_FIELDS: [&str; 3] = ["email_address", "email", "payer_email"];

/// Maps a provider `event_type` to the record status it implies. Event types
/// outside the capture family are audit-only.
pub fn map_event_type(event_type: &str) -> Option<PaymentStatus> {
    match event_type {
        "PAYMENT.CAPTURE.COMPLETED" => Some(PaymentStatus::Completed),
        "PAYMENT.CAPTURE.DENIED" => Some(PaymentStatus::Denied),
        "PAYMENT.CAPTURE.PENDING" => Some(PaymentStatus::Pending),
        "PAYMENT.CAPTURE.CANCELLED" => Some(PaymentStatus::Cancelled),
        "PAYMENT.CAPTURE.REFUNDED" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// Normalizes a raw webhook payload.
///
/// `resource.id` is mandatory for every event, including unmapped types;
/// a payload without it cannot be reconciled and is rejected before the
/// store is involved.
pub fn normalize(payload: &JsonValue) -> PaymentResult<StatusEvent> {
    let resource = payload.get("resource");

    let capture_id = resource
        .and_then(|r| r.get("id"))
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(PaymentError::MissingResourceId)?
        .to_string();

    let event_type = payload
        .get("event_type")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();

    let new_status = map_event_type(&event_type);

    let payer_email = resource
        .and_then(|r| r.get("payer"))
        .and_then(extract_payer_email);

    let order_id = resource
        .and_then(|r| r.get("supplementary_data"))
        .and_then(|s| s.get("related_ids"))
        .and_then(|ids| ids.get("order_id"))
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let refund = if new_status == Some(PaymentStatus::Refunded) {
        Some(RefundInfo {
            refund_id: capture_id.clone(),
            amount: resource.and_then(|r| r.get("amount")).and_then(parse_amount),
        })
    } else {
        None
    };

    Ok(StatusEvent {
        capture_id,
        order_id,
        new_status,
        payer_email,
        refund,
        event_type,
        raw: payload.clone(),
    })
}

fn extract_payer_email(payer: &JsonValue) -> Option<String> {
    PAYER_EMAIL_FIELDS.iter().find_map(|field| {
        payer
            .get(field)
            .and_then(JsonValue::as_str)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
    })
}

fn parse_amount(amount: &JsonValue) -> Option<Money> {
    let currency = amount.get("currency_code").and_then(JsonValue::as_str)?;
    let value = amount.get("value").and_then(JsonValue::as_str)?;
    Some(Money::new(currency, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capture_payload(event_type: &str, capture_id: &str) -> JsonValue {
        json!({
            "event_type": event_type,
            "resource": {
                "id": capture_id,
                "amount": {"currency_code": "USD", "value": "20.00"},
                "payer": {"email_address": "buyer@example.com"}
            }
        })
    }

    #[test]
    fn test_event_type_mapping_table() {
        assert_eq!(
            map_event_type("PAYMENT.CAPTURE.COMPLETED"),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(
            map_event_type("PAYMENT.CAPTURE.DENIED"),
            Some(PaymentStatus::Denied)
        );
        assert_eq!(
            map_event_type("PAYMENT.CAPTURE.PENDING"),
            Some(PaymentStatus::Pending)
        );
        assert_eq!(
            map_event_type("PAYMENT.CAPTURE.CANCELLED"),
            Some(PaymentStatus::Cancelled)
        );
        assert_eq!(
            map_event_type("PAYMENT.CAPTURE.REFUNDED"),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(map_event_type("CHECKOUT.ORDER.APPROVED"), None);
        assert_eq!(map_event_type(""), None);
    }

    #[test]
    fn test_normalizes_completed_capture() {
        let event = normalize(&capture_payload("PAYMENT.CAPTURE.COMPLETED", "CAP-1")).unwrap();
        assert_eq!(event.capture_id, "CAP-1");
        assert_eq!(event.new_status, Some(PaymentStatus::Completed));
        assert_eq!(event.payer_email.as_deref(), Some("buyer@example.com"));
        assert!(event.refund.is_none());
        assert_eq!(event.event_type, "PAYMENT.CAPTURE.COMPLETED");
        assert_eq!(event.raw["resource"]["id"], "CAP-1");
    }

    #[test]
    fn test_unknown_event_type_is_audit_only() {
        let event = normalize(&capture_payload("CHECKOUT.ORDER.APPROVED", "CAP-1")).unwrap();
        assert!(event.new_status.is_none());
        assert_eq!(event.capture_id, "CAP-1");
    }

    #[test]
    fn test_missing_resource_id_is_rejected() {
        assert!(matches!(
            normalize(&json!({"event_type": "PAYMENT.CAPTURE.COMPLETED"})),
            Err(PaymentError::MissingResourceId)
        ));
        assert!(matches!(
            normalize(&json!({"event_type": "PAYMENT.CAPTURE.COMPLETED", "resource": {}})),
            Err(PaymentError::MissingResourceId)
        ));
        assert!(matches!(
            normalize(&json!({"resource": {"id": ""}})),
            Err(PaymentError::MissingResourceId)
        ));
        // Required even for unmapped event types.
        assert!(matches!(
            normalize(&json!({"event_type": "SOMETHING.ELSE", "resource": {}})),
            Err(PaymentError::MissingResourceId)
        ));
    }

    #[test]
    fn test_payer_email_candidate_order() {
        let payload = json!({
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "CAP-1",
                "payer": {
                    "payer_email": "third@example.com",
                    "email": "second@example.com",
                    "email_address": "first@example.com"
                }
            }
        });
        let event = normalize(&payload).unwrap();
        assert_eq!(event.payer_email.as_deref(), Some("first@example.com"));

        let payload = json!({
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "CAP-1",
                "payer": {
                    "email_address": "",
                    "email": "second@example.com"
                }
            }
        });
        let event = normalize(&payload).unwrap();
        assert_eq!(event.payer_email.as_deref(), Some("second@example.com"));

        let payload = json!({
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {"id": "CAP-1"}
        });
        let event = normalize(&payload).unwrap();
        assert!(event.payer_email.is_none());
    }

    #[test]
    fn test_refunded_event_carries_refund_info() {
        let event = normalize(&capture_payload("PAYMENT.CAPTURE.REFUNDED", "CAP-2")).unwrap();
        let refund = event.refund.expect("refund info");
        assert_eq!(refund.refund_id, "CAP-2");
        assert_eq!(refund.amount, Some(Money::new("USD", "20.00")));

        // Amount block is optional on refund events.
        let payload = json!({
            "event_type": "PAYMENT.CAPTURE.REFUNDED",
            "resource": {"id": "CAP-3"}
        });
        let event = normalize(&payload).unwrap();
        let refund = event.refund.expect("refund info");
        assert_eq!(refund.refund_id, "CAP-3");
        assert!(refund.amount.is_none());
    }

    #[test]
    fn test_order_correlation_extraction() {
        let payload = json!({
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "CAP-1",
                "supplementary_data": {"related_ids": {"order_id": "ORD-77"}}
            }
        });
        let event = normalize(&payload).unwrap();
        assert_eq!(event.order_id.as_deref(), Some("ORD-77"));

        let event = normalize(&capture_payload("PAYMENT.CAPTURE.COMPLETED", "CAP-1")).unwrap();
        assert!(event.order_id.is_none());
    }
}
