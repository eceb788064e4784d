//! Outbound HTTP for hook attempts.
//!
//! [`HookClient`] performs exactly one request per call. It never retries;
//! retry decisions belong to the dispatcher. Any status code that arrives
//! before the deadline is a [`DeliveryResponse`]; only transport problems
//! and timeouts are errors.

use std::time::Duration;

use cms_core::execution::{http_failure_message, is_success_status, truncate_body};
use cms_core::hooks::HttpMethod;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why an attempt did not produce a successful delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No complete response before the hook's deadline.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// DNS, TCP or TLS failure reaching the endpoint.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other failure building or sending the request.
    #[error("Request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-2xx status.
    #[error("{}", status_message(.status, .body))]
    HttpStatus { status: u16, body: String },
}

fn status_message(status: &u16, body: &str) -> String {
    http_failure_message(*status, body)
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            DeliveryError::Connect(e.to_string())
        } else {
            DeliveryError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// One outbound attempt.
#[derive(Debug)]
pub struct DeliveryRequest<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    /// Serialized as the JSON body unless the method sends none.
    pub payload: &'a serde_json::Value,
    pub timeout: Duration,
}

/// Whatever the endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    /// Cut the body down to `max_bytes` on a char boundary.
    pub fn truncated(mut self, max_bytes: usize) -> Self {
        let len = truncate_body(&self.body, max_bytes).len();
        self.body.truncate(len);
        self
    }

    /// The failure for a non-2xx answer, `None` on success.
    pub fn error(&self) -> Option<DeliveryError> {
        (!self.is_success()).then(|| DeliveryError::HttpStatus {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// HookClient
// ---------------------------------------------------------------------------

/// Thin wrapper over a shared [`reqwest::Client`].
#[derive(Clone, Default)]
pub struct HookClient {
    client: reqwest::Client,
}

impl HookClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send one request and read the full response body.
    ///
    /// The deadline covers connecting, sending and reading the body.
    pub async fn send(
        &self,
        request: &DeliveryRequest<'_>,
    ) -> Result<DeliveryResponse, DeliveryError> {
        let mut builder = self.client.request(to_reqwest_method(request.method), request.url);
        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.method.sends_body() {
            builder = builder.body(request.payload.to_string());
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        url = request.url,
                        status,
                        error = %e,
                        "Failed to read hook response body"
                    );
                    String::new()
                }
            };
            Ok::<_, DeliveryError>(DeliveryResponse { status, body })
        };

        match tokio::time::timeout(request.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(request.timeout)),
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
