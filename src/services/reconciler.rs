//! Applies normalized webhook events to durable payment records.
//!
//! The provider redelivers events until acknowledged and may deliver them
//! out of order, so every outcome here is either idempotent or soft. Only
//! store infrastructure failures escalate into hard errors.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::database::error::DatabaseError;
use crate::database::store::PaymentStore;
use crate::logging::mask_email;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{PaymentRecord, StatusEvent};

/// Result of applying one event.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// A status-bearing event updated the record.
    Applied { record: PaymentRecord },
    /// The event carried no mapped status; only the audit trail grew.
    NoOp { record: PaymentRecord },
    /// No record matches the event. Soft: acknowledged, nothing created.
    NotFound { capture_id: String },
}

impl ReconcileOutcome {
    /// Short label reported back to the provider in the webhook response.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::NoOp { .. } => "ignored",
            ReconcileOutcome::NotFound { .. } => "unmatched",
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn PaymentStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    pub async fn apply(&self, event: StatusEvent) -> PaymentResult<ReconcileOutcome> {
        let capture_id = event.capture_id.clone();
        let order_hint = event.order_id.clone();
        let has_status = event.new_status.is_some();

        let mutate = |record: &mut PaymentRecord| record.apply_event(&event);
        let result = self
            .store
            .upsert(&capture_id, order_hint.as_deref(), &mutate)
            .await;

        match result {
            Ok(record) if has_status => {
                info!(
                    capture_id = %capture_id,
                    order_id = %record.order_id,
                    status = %record.status,
                    payer = %record
                        .payer_email
                        .as_deref()
                        .map(mask_email)
                        .unwrap_or_default(),
                    "Webhook event applied"
                );
                Ok(ReconcileOutcome::Applied { record })
            }
            Ok(record) => {
                info!(
                    capture_id = %capture_id,
                    event_type = %record
                        .raw_events
                        .last()
                        .and_then(|e| e.get("event_type"))
                        .and_then(|t| t.as_str())
                        .unwrap_or("unknown"),
                    "Webhook event recorded without status change"
                );
                Ok(ReconcileOutcome::NoOp { record })
            }
            Err(DatabaseError::NotFound { .. }) => {
                warn!(
                    capture_id = %capture_id,
                    order_hint = order_hint.as_deref().unwrap_or(""),
                    "Webhook event matches no payment record, acknowledging"
                );
                Ok(ReconcileOutcome::NotFound { capture_id })
            }
            Err(e) => {
                error!(capture_id = %capture_id, error = %e, "Payment store failed applying event");
                Err(PaymentError::from(e))
            }
        }
    }
}
