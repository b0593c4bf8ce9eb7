//! In-memory payment store with the same semantics as the Postgres one.
//!
//! Backs the integration tests; the single write lock stands in for the
//! per-row lock the Postgres store takes.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::error::DatabaseError;
use crate::database::store::{PaymentStore, RecordMutator};
use crate::payments::types::PaymentRecord;

#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, record: PaymentRecord) -> Result<PaymentRecord, DatabaseError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.order_id) {
            return Err(DatabaseError::duplicate("payment_record", &record.order_id));
        }
        records.insert(record.order_id.clone(), record.clone());
        Ok(record)
    }

    async fn upsert(
        &self,
        capture_id: &str,
        order_id: Option<&str>,
        mutate: RecordMutator<'_>,
    ) -> Result<PaymentRecord, DatabaseError> {
        let mut records = self.records.write().await;

        let key = records
            .values()
            .find(|r| r.capture_id.as_deref() == Some(capture_id))
            .map(|r| r.order_id.clone())
            .or_else(|| {
                order_id
                    .and_then(|oid| records.get(oid))
                    .filter(|r| r.capture_id.is_none())
                    .map(|r| r.order_id.clone())
            });

        let Some(key) = key else {
            return Err(DatabaseError::not_found("payment_record", capture_id));
        };

        let record = records
            .get_mut(&key)
            .expect("record disappeared under write lock");
        if record.capture_id.as_deref() != Some(capture_id) {
            record.capture_id = Some(capture_id.to_string());
        }
        mutate(record);
        Ok(record.clone())
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self.records.read().await.get(order_id).cloned())
    }

    async fn find_by_capture_id(
        &self,
        capture_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.capture_id.as_deref() == Some(capture_id))
            .cloned())
    }
}
