//! Order provider abstraction.
//!
//! The live implementation talks to PayPal; tests inject a stub. Webhook
//! intake is not part of the trait because events arrive over the service's
//! own HTTP surface, not through provider-specific polling.

use async_trait::async_trait;

use crate::payments::error::PaymentResult;
use crate::payments::types::{OrderRequest, OrderResponse};

#[async_trait]
pub trait OrderProvider: Send + Sync {
    /// Stable provider identifier used in logs.
    fn name(&self) -> &str;

    /// Creates a provider-side order for a validated amount and returns the
    /// provider order id together with the provider's status string.
    async fn create_order(&self, request: OrderRequest) -> PaymentResult<OrderResponse>;
}
