use thiserror::Error;

use crate::database::error::DatabaseError;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Failure taxonomy for the payment order lifecycle.
///
/// `RecordNotFound` is a soft outcome on the webhook path: it is logged and
/// acknowledged to the provider rather than surfaced as an HTTP error.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Webhook payload has no resource id")]
    MissingResourceId,

    #[error("Provider rejected the request: {message}")]
    ProviderRejected {
        message: String,
        provider_code: Option<String>,
    },

    #[error("Provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("Order {order_id} already exists")]
    DuplicateOrder { order_id: String },

    #[error("No payment record for capture {capture_id}")]
    RecordNotFound { capture_id: String },

    #[error("Payment store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Unexpected payment failure: {message}")]
    Unknown { message: String },
}

impl PaymentError {
    /// Whether retrying the same call can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::ProviderUnavailable { .. } | PaymentError::StoreUnavailable { .. }
        )
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::MissingResourceId => 400,
            PaymentError::ProviderRejected { .. } => 502,
            PaymentError::ProviderUnavailable { .. } => 503,
            PaymentError::DuplicateOrder { .. } => 409,
            PaymentError::RecordNotFound { .. } => 404,
            PaymentError::StoreUnavailable { .. } => 500,
            PaymentError::Unknown { .. } => 500,
        }
    }

    /// Message safe to return to API callers. Provider bodies and database
    /// detail stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::InvalidAmount { message } => message.clone(),
            PaymentError::MissingResourceId => "Webhook payload has no resource id".to_string(),
            PaymentError::ProviderRejected { provider_code, .. } => match provider_code {
                Some(code) => format!("Payment provider rejected the order ({code})"),
                None => "Payment provider rejected the order".to_string(),
            },
            PaymentError::ProviderUnavailable { .. } => {
                "Payment provider is temporarily unavailable, please retry".to_string()
            }
            PaymentError::DuplicateOrder { order_id } => {
                format!("A payment for order {order_id} already exists")
            }
            PaymentError::RecordNotFound { capture_id } => {
                format!("No payment record matches capture {capture_id}")
            }
            PaymentError::StoreUnavailable { .. } => {
                "Payment storage is temporarily unavailable".to_string()
            }
            PaymentError::Unknown { .. } => "Payment processing failed".to_string(),
        }
    }
}

impl From<DatabaseError> for PaymentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { id, .. } => PaymentError::RecordNotFound { capture_id: id },
            DatabaseError::Duplicate { id, .. } => PaymentError::DuplicateOrder { order_id: id },
            DatabaseError::Timeout { message }
            | DatabaseError::Connection { message }
            | DatabaseError::Unknown { message } => PaymentError::StoreUnavailable { message },
        }
    }
}
