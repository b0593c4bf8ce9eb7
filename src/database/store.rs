//! The payment store port.
//!
//! Two implementations exist: the Postgres store used in production and an
//! in-memory store for the integration suite. Handlers and the reconciler
//! only ever see this trait behind an `Arc`.

use async_trait::async_trait;

use crate::database::error::DatabaseError;
use crate::payments::types::PaymentRecord;

/// Mutation applied to a located record inside the store's atomic section.
pub type RecordMutator<'a> = &'a (dyn Fn(&mut PaymentRecord) + Send + Sync);

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a freshly created record. Fails with
    /// [`DatabaseError::Duplicate`] when a record for the same order id
    /// already exists.
    async fn create(&self, record: PaymentRecord) -> Result<PaymentRecord, DatabaseError>;

    /// Atomically locates and mutates one record.
    ///
    /// Lookup is by capture id first. When no record carries `capture_id`
    /// and `order_id` is given, the unclaimed record for that order is
    /// claimed: its capture id is assigned before the mutator runs. No
    /// record is ever created here; a miss is [`DatabaseError::NotFound`].
    async fn upsert(
        &self,
        capture_id: &str,
        order_id: Option<&str>,
        mutate: RecordMutator<'_>,
    ) -> Result<PaymentRecord, DatabaseError>;

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError>;

    async fn find_by_capture_id(
        &self,
        capture_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError>;
}
