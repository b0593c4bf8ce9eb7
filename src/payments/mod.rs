//! Payment order lifecycle: amount validation, provider order creation and
//! webhook event normalization.

pub mod amount;
pub mod error;
pub mod events;
pub mod paypal;
pub mod provider;
pub mod types;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use types::{
    Money, OrderRequest, OrderResponse, PaymentRecord, PaymentStatus, RefundInfo, StatusEvent,
};
