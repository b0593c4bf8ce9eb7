//! Postgres-backed payment record store.
//!
//! The upsert runs in a transaction with `SELECT … FOR UPDATE`, so all
//! mutation for one capture id serializes on the row lock. Unique indexes
//! on `order_id` and on assigned `capture_id` back the one-record-per-key
//! invariants.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::store::{PaymentStore, RecordMutator};
use crate::payments::types::{Money, PaymentRecord, PaymentStatus, RefundInfo};

const ENTITY: &str = "payment_record";

const SELECT_COLUMNS: &str = "id, order_id, capture_id, reference_id, status, currency, amount, \
     payer_email, session_email, refunded, refund_id, refund_currency, refund_amount, \
     raw_events, created_at, updated_at";

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRecordRow {
    id: Uuid,
    order_id: String,
    capture_id: Option<String>,
    reference_id: String,
    status: String,
    currency: String,
    amount: BigDecimal,
    payer_email: Option<String>,
    session_email: Option<String>,
    refunded: bool,
    refund_id: Option<String>,
    refund_currency: Option<String>,
    refund_amount: Option<BigDecimal>,
    raw_events: JsonValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRecordRow> for PaymentRecord {
    type Error = DatabaseError;

    fn try_from(row: PaymentRecordRow) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from_str(&row.status).map_err(|e| DatabaseError::Unknown {
            message: format!("corrupt status on record {}: {e}", row.id),
        })?;

        let refund = row.refund_id.map(|refund_id| RefundInfo {
            refund_id,
            amount: match (row.refund_currency, row.refund_amount) {
                (Some(currency), Some(amount)) => {
                    Some(Money::new(currency, amount.with_scale(2).to_string()))
                }
                _ => None,
            },
        });

        let raw_events = match row.raw_events {
            JsonValue::Array(events) => events,
            JsonValue::Null => Vec::new(),
            other => {
                return Err(DatabaseError::Unknown {
                    message: format!("corrupt raw_events on record {}: {other}", row.id),
                })
            }
        };

        Ok(PaymentRecord {
            id: row.id,
            order_id: row.order_id,
            capture_id: row.capture_id,
            reference_id: row.reference_id,
            status,
            amount: Money::new(row.currency, row.amount.with_scale(2).to_string()),
            payer_email: row.payer_email,
            session_email: row.session_email,
            refunded: row.refunded,
            refund,
            raw_events,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decimal(value: &str) -> Result<BigDecimal, DatabaseError> {
    BigDecimal::from_str(value).map_err(|e| DatabaseError::Unknown {
        message: format!("amount '{value}' is not a valid decimal: {e}"),
    })
}

#[async_trait::async_trait]
impl PaymentStore for PgPaymentStore {
    async fn create(&self, record: PaymentRecord) -> Result<PaymentRecord, DatabaseError> {
        let amount = decimal(&record.amount.value)?;
        let refund_id = record.refund.as_ref().map(|r| r.refund_id.clone());
        let refund_currency = record
            .refund
            .as_ref()
            .and_then(|r| r.amount.as_ref())
            .map(|a| a.currency.clone());
        let refund_amount = record
            .refund
            .as_ref()
            .and_then(|r| r.amount.as_ref())
            .map(|a| decimal(&a.value))
            .transpose()?;

        let query = format!(
            "INSERT INTO payment_records ({SELECT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {SELECT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, PaymentRecordRow>(&query)
            .bind(record.id)
            .bind(&record.order_id)
            .bind(record.capture_id.as_deref())
            .bind(&record.reference_id)
            .bind(record.status.as_str())
            .bind(&record.amount.currency)
            .bind(amount)
            .bind(record.payer_email.as_deref())
            .bind(record.session_email.as_deref())
            .bind(record.refunded)
            .bind(refund_id.as_deref())
            .bind(refund_currency.as_deref())
            .bind(refund_amount)
            .bind(JsonValue::Array(record.raw_events.clone()))
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, &record.order_id))?;

        PaymentRecord::try_from(row)
    }

    async fn upsert(
        &self,
        capture_id: &str,
        order_id: Option<&str>,
        mutate: RecordMutator<'_>,
    ) -> Result<PaymentRecord, DatabaseError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, capture_id))?;

        let by_capture = format!(
            "SELECT {SELECT_COLUMNS} FROM payment_records WHERE capture_id = $1 FOR UPDATE"
        );
        let mut row = sqlx::query_as::<_, PaymentRecordRow>(&by_capture)
            .bind(capture_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, capture_id))?;

        // First event for this capture: claim the unclaimed record created
        // at order time, when the event tells us which order it belongs to.
        if row.is_none() {
            if let Some(order_id) = order_id {
                let by_order = format!(
                    "SELECT {SELECT_COLUMNS} FROM payment_records \
                     WHERE order_id = $1 AND capture_id IS NULL FOR UPDATE"
                );
                row = sqlx::query_as::<_, PaymentRecordRow>(&by_order)
                    .bind(order_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, order_id))?;
            }
        }

        let Some(row) = row else {
            let _ = tx.rollback().await;
            return Err(DatabaseError::not_found(ENTITY, capture_id));
        };

        let mut record = PaymentRecord::try_from(row)?;
        if record.capture_id.as_deref() != Some(capture_id) {
            record.capture_id = Some(capture_id.to_string());
        }
        mutate(&mut record);

        let refund_id = record.refund.as_ref().map(|r| r.refund_id.clone());
        let refund_currency = record
            .refund
            .as_ref()
            .and_then(|r| r.amount.as_ref())
            .map(|a| a.currency.clone());
        let refund_amount = record
            .refund
            .as_ref()
            .and_then(|r| r.amount.as_ref())
            .map(|a| decimal(&a.value))
            .transpose()?;

        sqlx::query(
            "UPDATE payment_records SET capture_id = $2, status = $3, payer_email = $4, \
             refunded = $5, refund_id = $6, refund_currency = $7, refund_amount = $8, \
             raw_events = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.capture_id.as_deref())
        .bind(record.status.as_str())
        .bind(record.payer_email.as_deref())
        .bind(record.refunded)
        .bind(refund_id.as_deref())
        .bind(refund_currency.as_deref())
        .bind(refund_amount)
        .bind(JsonValue::Array(record.raw_events.clone()))
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, capture_id))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, capture_id))?;

        Ok(record)
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        let query =
            format!("SELECT {SELECT_COLUMNS} FROM payment_records WHERE order_id = $1");
        let row = sqlx::query_as::<_, PaymentRecordRow>(&query)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, order_id))?;
        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_by_capture_id(
        &self,
        capture_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        let query =
            format!("SELECT {SELECT_COLUMNS} FROM payment_records WHERE capture_id = $1");
        let row = sqlx::query_as::<_, PaymentRecordRow>(&query)
            .bind(capture_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, ENTITY, capture_id))?;
        row.map(PaymentRecord::try_from).transpose()
    }
}
