//! HTTP transport with admission control, retry, and error classification
//!
//! One logical call = one `send`. Retry and backoff are local to that call;
//! concurrent calls do not block each other beyond the shared rate limiters.

use super::rate_limit::{EndpointClass, RateLimiter};
use crate::config::{ApiConfig, TransportConfig};
use crate::error::{Error, Result};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Merge a map of headers
    #[must_use]
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Parsed response body.
///
/// A body that is not valid JSON is carried as raw text rather than failing
/// the call outright.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Structured JSON body
    Json(Value),
    /// Unparsable body carried verbatim
    Text(String),
    /// No body
    Empty,
}

impl ResponseBody {
    fn parse(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Deserialize the body into a typed record
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Text(text) => Ok(serde_json::from_str(&text)?),
            Self::Empty => Ok(serde_json::from_value(Value::Null)?),
        }
    }

    /// The human-readable `message` field of an error body, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value.get("message").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// HTTP transport for the remote API
pub struct Transport {
    client: Client,
    base_url: Url,
    config: TransportConfig,
    auth_limiter: RateLimiter,
    data_limiter: RateLimiter,
}

impl Transport {
    /// Create a new transport for the given API
    pub fn new(api: &ApiConfig, config: TransportConfig) -> Result<Self> {
        let base_url = Url::parse(&api.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            auth_limiter: RateLimiter::new(config.auth_requests_per_minute),
            data_limiter: RateLimiter::new(config.data_requests_per_minute),
            config,
        })
    }

    /// The rate limiter covering the given path
    pub fn limiter_for(&self, path: &str) -> &RateLimiter {
        match EndpointClass::classify(path) {
            EndpointClass::Authorization => &self.auth_limiter,
            EndpointClass::AccountData => &self.data_limiter,
        }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str, request: RequestConfig) -> Result<ResponseBody> {
        self.send(Method::GET, path, request).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, request: RequestConfig) -> Result<ResponseBody> {
        self.send(Method::POST, path, request).await
    }

    /// Make a PUT request
    pub async fn put(&self, path: &str, request: RequestConfig) -> Result<ResponseBody> {
        self.send(Method::PUT, path, request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str, request: RequestConfig) -> Result<ResponseBody> {
        self.send(Method::DELETE, path, request).await
    }

    /// Perform one logical HTTP call.
    ///
    /// Server errors (>= 500), timeouts, and connection failures are retried
    /// up to `max_retries` with exponential backoff. 4xx statuses fail
    /// immediately, and 429 is surfaced as [`Error::RateLimited`] rather than
    /// retried here.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestConfig,
    ) -> Result<ResponseBody> {
        self.limiter_for(path).acquire().await;

        let url = self.build_url(path);
        debug!(
            method = %method,
            url = %url,
            headers = ?masked_headers(&request.headers),
            "sending request"
        );

        let mut attempt: u32 = 0;
        loop {
            let result = self
                .build_request(method.clone(), &url, &request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status >= 500 && attempt < self.config.max_retries {
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            status,
                            attempt = attempt + 1,
                            max = self.config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "server error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return self.classify_response(&method, &url, response).await;
                }
                Err(e) => {
                    let mapped = self.map_request_error(e);
                    if mapped.is_retryable() && attempt < self.config.max_retries {
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            error = %mapped,
                            attempt = attempt + 1,
                            max = self.config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(mapped);
                }
            }
        }
    }

    /// Backoff before retry `attempt`: initial_backoff * factor ^ attempt,
    /// capped at `max_backoff`.
    pub fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let factor = self.config.backoff_factor.powi(attempt as i32);
        let delay = self.config.initial_backoff.mul_f64(factor.max(0.0));
        std::cmp::min(delay, self.config.max_backoff)
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        request: &RequestConfig,
    ) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url).header("Accept", "application/json");

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }
        req
    }

    async fn classify_response(
        &self,
        method: &Method,
        url: &str,
        response: Response,
    ) -> Result<ResponseBody> {
        let status = response.status();
        let request_id = header_value(&response, "X-Request-ID");
        let retry_after = header_value(&response, "Retry-After")
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::connection_failure(format!("failed to read body: {e}")))?;
        let body = ResponseBody::parse(&bytes);

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            bytes = bytes.len(),
            request_id = request_id.as_deref().unwrap_or("-"),
            "response received"
        );

        if status.as_u16() == 429 {
            return Err(Error::RateLimited {
                retry_after_seconds: retry_after,
                request_id,
            });
        }

        if status.is_success() {
            return Ok(body);
        }

        let message = body
            .message()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(Error::from_status(status.as_u16(), message))
    }

    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::connection_failure(e.to_string())
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Mask a sensitive value for logging, keeping only the edges
pub fn mask_sensitive(value: &str) -> String {
    match (value.get(..4), value.get(value.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if value.len() > 8 => format!("{head}****{tail}"),
        _ => "****".to_string(),
    }
}

const SENSITIVE_KEYS: [&str; 6] = ["authorization", "token", "secret", "key", "iban", "account"];

fn masked_headers(headers: &HashMap<String, String>) -> HashMap<&str, String> {
    headers
        .iter()
        .map(|(key, value)| {
            let lower = key.to_lowercase();
            if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                (key.as_str(), mask_sensitive(value))
            } else {
                (key.as_str(), value.clone())
            }
        })
        .collect()
}
