//! PayPal order gateway (Orders v2).
//!
//! Orders are created with a single purchase unit and no item breakdown.
//! The caller's reference id doubles as the `PayPal-Request-Id` idempotency
//! header, so the create call is safe to retry.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::payments::error::PaymentResult;
use crate::payments::provider::OrderProvider;
use crate::payments::types::{OrderRequest, OrderResponse};
use crate::payments::utils::ProviderHttpClient;

/// Refresh the cached OAuth token this long before the provider expires it.
const TOKEN_EXPIRY_SLACK_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl PaypalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = std::env::var("PAYPAL_CLIENT_ID")
            .map_err(|_| ConfigError::MissingVariable("PAYPAL_CLIENT_ID".to_string()))?;
        let client_secret = std::env::var("PAYPAL_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingVariable("PAYPAL_CLIENT_SECRET".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            base_url: std::env::var("PAYPAL_BASE_URL")
                .unwrap_or_else(|_| "https://api-m.paypal.com".to_string()),
            timeout_secs: std::env::var("PAYPAL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
            max_retries: std::env::var("PAYPAL_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(2),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct PaypalOrder {
    id: String,
    status: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct PaypalGateway {
    config: PaypalConfig,
    http: ProviderHttpClient,
    token: RwLock<Option<CachedToken>>,
}

impl PaypalGateway {
    pub fn new(config: PaypalConfig) -> PaymentResult<Self> {
        let http = ProviderHttpClient::new(
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;
        Ok(Self {
            config,
            http,
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Returns a valid bearer token, exchanging client credentials when the
    /// cached one is missing or close to expiry.
    async fn access_token(&self) -> PaymentResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(cached) = guard.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        debug!("Fetching provider access token");
        let response: TokenResponse = self
            .http
            .request_form(
                &self.endpoint("/v1/oauth2/token"),
                &self.config.client_id,
                &self.config.client_secret,
                &[("grant_type", "client_credentials")],
            )
            .await?;

        let lifetime = response
            .expires_in
            .saturating_sub(TOKEN_EXPIRY_SLACK_SECS)
            .max(1);
        let expires_at = Instant::now() + Duration::from_secs(lifetime);

        let mut guard = self.token.write().await;
        *guard = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at,
        });
        Ok(response.access_token)
    }

    fn build_description(request: &OrderRequest) -> String {
        match (&request.original_total, &request.original_currency) {
            (Some(total), Some(currency)) => format!(
                "{} ({} {} = {} {})",
                request.product_name, total, currency, request.amount.value, request.amount.currency
            ),
            _ => request.product_name.clone(),
        }
    }

    fn build_order_payload(request: &OrderRequest) -> JsonValue {
        json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.reference_id,
                "description": Self::build_description(request),
                "amount": {
                    "currency_code": request.amount.currency,
                    "value": request.amount.value,
                }
            }]
        })
    }
}

#[async_trait]
impl OrderProvider for PaypalGateway {
    fn name(&self) -> &str {
        "paypal"
    }

    async fn create_order(&self, request: OrderRequest) -> PaymentResult<OrderResponse> {
        let token = self.access_token().await?;
        let payload = Self::build_order_payload(&request);

        info!(
            reference_id = %request.reference_id,
            amount = %request.amount,
            "Creating provider order"
        );

        let order: PaypalOrder = self
            .http
            .request_json(
                Method::POST,
                &self.endpoint("/v2/checkout/orders"),
                Some(&token),
                Some(&payload),
                &[("PayPal-Request-Id", request.reference_id.as_str())],
            )
            .await?;

        info!(order_id = %order.id, status = %order.status, "Provider order created");
        Ok(OrderResponse {
            order_id: order.id,
            status: order.status,
        })
    }
}
