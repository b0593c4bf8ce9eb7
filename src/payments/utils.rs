//! HTTP plumbing shared by provider calls: bounded timeout, bounded
//! retries with exponential backoff, and provider status mapping into the
//! payment failure taxonomy.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

use crate::payments::error::{PaymentError, PaymentResult};

pub struct ProviderHttpClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl ProviderHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> PaymentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Unknown {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            max_retries,
        })
    }

    /// Sends a JSON request with an optional bearer token and decodes the
    /// JSON response body. Retries transient failures.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&JsonValue>,
        additional_headers: &[(&str, &str)],
    ) -> PaymentResult<T> {
        self.send_with_retries(url, || {
            let mut request = self.client.request(method.clone(), url);
            if let Some(token) = bearer_token {
                request = request.bearer_auth(token);
            }
            for (name, value) in additional_headers {
                request = request.header(*name, *value);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request
        })
        .await
    }

    /// Sends a form-encoded request under HTTP basic auth. Used for the
    /// provider OAuth token exchange.
    pub async fn request_form<T: DeserializeOwned>(
        &self,
        url: &str,
        username: &str,
        password: &str,
        form: &[(&str, &str)],
    ) -> PaymentResult<T> {
        self.send_with_retries(url, || {
            self.client
                .post(url)
                .basic_auth(username, Some(password))
                .form(form)
        })
        .await
    }

    async fn send_with_retries<T: DeserializeOwned>(
        &self,
        url: &str,
        build_request: impl Fn() -> reqwest::RequestBuilder,
    ) -> PaymentResult<T> {
        let mut attempt: u32 = 0;
        loop {
            // reqwest builders are single-use, so rebuild per attempt.
            let result = build_request().send().await;

            let error = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|e| PaymentError::Unknown {
                            message: format!("failed to decode provider response: {e}"),
                        });
                    }
                    let body = response.text().await.unwrap_or_default();
                    map_status_error(status, &body)
                }
                Err(e) => map_transport_error(&e),
            };

            if error.is_retryable() && attempt < self.max_retries {
                attempt += 1;
                let backoff = Duration::from_secs(1u64 << attempt);
                warn!(
                    url = url,
                    attempt = attempt,
                    backoff_secs = backoff.as_secs(),
                    error = %error,
                    "Provider request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            return Err(error);
        }
    }
}

/// Maps a non-success provider status into the failure taxonomy. Rate
/// limiting and server errors are retryable; other 4xx are rejections and
/// carry the provider error code when the body exposes one.
pub(crate) fn map_status_error(status: StatusCode, body: &str) -> PaymentError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return PaymentError::ProviderUnavailable {
            message: "provider rate limited the request".to_string(),
        };
    }
    if status.is_server_error() {
        return PaymentError::ProviderUnavailable {
            message: format!("provider returned {status}"),
        };
    }
    if status.is_client_error() {
        return PaymentError::ProviderRejected {
            message: format!("provider returned {status}: {body}"),
            provider_code: extract_provider_code(body),
        };
    }
    PaymentError::Unknown {
        message: format!("unexpected provider status {status}"),
    }
}

fn map_transport_error(err: &reqwest::Error) -> PaymentError {
    if err.is_timeout() || err.is_connect() {
        PaymentError::ProviderUnavailable {
            message: format!("provider unreachable: {err}"),
        }
    } else {
        PaymentError::Unknown {
            message: format!("provider request failed: {err}"),
        }
    }
}

/// Pulls the machine-readable error code out of a provider error body.
/// Orders v2 uses `name`, the OAuth endpoint uses `error`.
fn extract_provider_code(body: &str) -> Option<String> {
    let parsed: JsonValue = serde_json::from_str(body).ok()?;
    parsed
        .get("name")
        .or_else(|| parsed.get("error"))
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}
