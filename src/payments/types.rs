//! Shared types for the payment order lifecycle: monetary values, the
//! durable payment record and the normalized webhook status event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A monetary value as the provider understands it: a currency code and a
/// decimal string already normalized to two fraction digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency: String,
    pub value: String,
}

impl Money {
    pub fn new(currency: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Payment record status, following the provider capture vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Denied,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Denied => "DENIED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "DENIED" => Ok(PaymentStatus::Denied),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Refund details attached to a record by a REFUNDED event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInfo {
    pub refund_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
}

/// A provider webhook payload normalized into the fields the reconciler
/// acts on. `raw` keeps the complete original payload for the audit trail.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub capture_id: String,
    /// Order correlation from `resource.supplementary_data.related_ids`,
    /// present on capture events. Lets the first event claim the record
    /// created at order time.
    pub order_id: Option<String>,
    /// `None` for event types outside the capture mapping table; such
    /// events are audit-only.
    pub new_status: Option<PaymentStatus>,
    pub payer_email: Option<String>,
    pub refund: Option<RefundInfo>,
    pub event_type: String,
    pub raw: JsonValue,
}

/// Durable record of one payment order, keyed by provider order id and,
/// once the first webhook arrives, by capture id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub order_id: String,
    pub capture_id: Option<String>,
    pub reference_id: String,
    pub status: PaymentStatus,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_email: Option<String>,
    pub refunded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundInfo>,
    pub raw_events: Vec<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// A fresh PENDING record created when the provider order is placed.
    /// No capture id yet; the first webhook event assigns it.
    pub fn new(
        order_id: impl Into<String>,
        reference_id: impl Into<String>,
        amount: Money,
        session_email: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.into(),
            capture_id: None,
            reference_id: reference_id.into(),
            status: PaymentStatus::Pending,
            amount,
            payer_email: None,
            session_email,
            refunded: false,
            refund: None,
            raw_events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one normalized event to the record. Idempotent: re-applying
    /// the same event reproduces the same state (the raw audit trail is
    /// append-only and may hold duplicates).
    ///
    /// Status follows last-event-wins. `refunded` is sticky once set and
    /// `payer_email` is never cleared by an event without one.
    pub fn apply_event(&mut self, event: &StatusEvent) {
        self.raw_events.push(event.raw.clone());
        self.updated_at = Utc::now();

        let Some(status) = event.new_status else {
            return;
        };
        self.status = status;

        if let Some(email) = event.payer_email.as_deref().filter(|e| !e.is_empty()) {
            self.payer_email = Some(email.to_string());
        }

        if status == PaymentStatus::Refunded {
            self.refunded = true;
            if let Some(refund) = &event.refund {
                self.refund = Some(refund.clone());
            }
        }
    }
}

/// Input to the order gateway, already validated.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub amount: Money,
    pub product_name: String,
    pub original_total: Option<String>,
    pub original_currency: Option<String>,
    pub reference_id: String,
}

/// Provider order creation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
}
