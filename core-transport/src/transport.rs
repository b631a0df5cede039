//! Request execution with retry, cancellation and per-attempt tracing

use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::observer::{HttpObserver, RequestRecord, ResponseRecord};
use bytes::Bytes;
use core_runtime::config::{default_user_agent, ClientConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{RemoteRejection, Result, TransportError};
use crate::trace::TracingObserver;

/// One logical API call; may be attempted several times.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the API root, e.g. `/queues.create`
    pub path: String,
    /// Query pairs, serialized in insertion order
    pub query: Vec<(String, String)>,
    pub payload: Option<Bytes>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            payload: None,
            headers: Vec::new(),
        }
    }

    /// ClearML endpoints are all `POST`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
        self
    }

    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(payload).map_err(|e| {
            TransportError::InvalidRequest(format!("JSON serialization failed: {}", e))
        })?;
        self.payload = Some(Bytes::from(bytes));
        Ok(self)
    }
}

/// Decoded body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(serde_json::Value),
    /// The server sent no content
    Empty,
}

/// A response with status < 400
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: ApiBody,
}

impl ApiResponse {
    fn from_http(response: &HttpResponse, url: &str) -> Result<Self> {
        let body = if response.body.iter().all(u8::is_ascii_whitespace) {
            ApiBody::Empty
        } else {
            let value = serde_json::from_slice(&response.body).map_err(|e| {
                TransportError::Decode {
                    url: url.to_string(),
                    message: format!("response is not valid JSON: {}", e),
                }
            })?;
            ApiBody::Json(value)
        };

        Ok(Self {
            status: response.status,
            url: url.to_string(),
            body,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.body, ApiBody::Empty)
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            ApiBody::Json(value) => Some(value),
            ApiBody::Empty => None,
        }
    }

    /// Decode into a typed response; an empty body is a decode error.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self.body {
            ApiBody::Json(value) => serde_json::from_value(value).map_err(|e| {
                TransportError::Decode {
                    url: self.url,
                    message: e.to_string(),
                }
            }),
            ApiBody::Empty => Err(TransportError::Decode {
                url: self.url,
                message: "response body is empty".to_string(),
            }),
        }
    }
}

/// Executes [`ApiRequest`]s against a ClearML API root.
///
/// Every attempt is reported to the [`HttpObserver`] before it is sent and
/// after a response (or failure) comes back. Network failures and statuses
/// accepted by [`RetryPolicy::should_retry_status`] are retried with backoff;
/// any other status >= 400 is returned immediately as
/// [`TransportError::Rejected`].
#[derive(Clone)]
pub struct ApiTransport {
    http: Arc<dyn HttpClient>,
    base_url: Url,
    retry_policy: RetryPolicy,
    observer: Arc<dyn HttpObserver>,
    user_agent: String,
    request_timeout: Option<Duration>,
}

impl fmt::Debug for ApiTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTransport")
            .field("base_url", &self.base_url.as_str())
            .field("retry_policy", &self.retry_policy)
            .field("user_agent", &self.user_agent)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ApiTransport {
    /// Transport with the default retry policy and the tracing observer.
    pub fn new(http: Arc<dyn HttpClient>, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            retry_policy: RetryPolicy::default(),
            observer: Arc::new(TracingObserver),
            user_agent: default_user_agent(),
            request_timeout: None,
        }
    }

    /// Transport configured from a validated [`ClientConfig`].
    pub fn from_config(http: Arc<dyn HttpClient>, config: &ClientConfig) -> Self {
        Self::new(http, config.api_url().clone())
            .with_retry_policy(config.retry_policy().clone())
            .with_user_agent(config.user_agent())
            .with_request_timeout(config.request_timeout())
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn HttpObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Resolve a path against the API root and append the query pairs in order.
    pub fn endpoint_url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let path = path.trim();
        if path.is_empty() || path.contains("://") {
            return Err(TransportError::InvalidRequest(format!(
                "'{}' is not a path relative to the API root",
                path
            )));
        }

        let mut url = self.base_url.clone();
        if path.starts_with('/') {
            url.set_path(path);
        } else {
            url.set_path(&format!("/{}", path));
        }
        url.set_query(None);
        url.set_fragment(None);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    fn build_http_request(&self, request: &ApiRequest, url: &Url) -> HttpRequest {
        let mut http_request = HttpRequest::new(request.method, url.as_str())
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", "application/json");

        if let Some(payload) = &request.payload {
            http_request = http_request
                .header("Content-Type", "application/json")
                .body(payload.clone());
        }
        for (key, value) in &request.headers {
            http_request = http_request.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = self.request_timeout {
            http_request = http_request.timeout(timeout);
        }
        http_request
    }

    /// Execute a request, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Cancelled`] as soon as `cancel` fires, mid-attempt or
    ///   mid-backoff
    /// - [`TransportError::Network`] when no response was obtained within the
    ///   attempt budget, or the failure was not transient
    /// - [`TransportError::Rejected`] for a status >= 400 that is not retried,
    ///   or the last retryable one once attempts run out
    /// - [`TransportError::Decode`] when a success body is not JSON
    #[instrument(skip(self, request, cancel), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest, cancel: &CancellationToken) -> Result<ApiResponse> {
        let url = self.endpoint_url(&request.path, &request.query)?;
        let url_string = url.to_string();
        let http_request = self.build_http_request(&request, &url);
        let max_attempts = self.retry_policy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled { url: url_string });
            }

            self.observer
                .on_request(&RequestRecord::capture(&http_request, attempt));

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "Request cancelled in flight");
                    return Err(TransportError::Cancelled { url: url_string });
                }
                outcome = self.http.execute(http_request.clone()) => outcome,
            };

            let retry_reason = match outcome {
                Ok(response) => {
                    self.observer
                        .on_response(&ResponseRecord::capture(&response, &url_string, attempt));

                    if response.status < 400 {
                        debug!(status = response.status, attempt, "Request succeeded");
                        return ApiResponse::from_http(&response, &url_string);
                    }

                    if attempt >= max_attempts
                        || !self.retry_policy.should_retry_status(response.status)
                    {
                        return Err(TransportError::Rejected(RemoteRejection::new(
                            response.status,
                            url_string,
                            &response.body,
                        )));
                    }
                    format!("status {}", response.status)
                }
                Err(error) => {
                    self.observer
                        .on_failure(attempt, &url_string, &error.to_string());

                    if attempt >= max_attempts || !error.is_transient() {
                        return Err(network_error(url_string, attempt, error));
                    }
                    error.to_string()
                }
            };

            let delay = self.retry_policy.delay_for(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %retry_reason,
                "Retrying request"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(TransportError::Cancelled { url: url_string });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn network_error(url: String, attempts: u32, source: BridgeError) -> TransportError {
    TransportError::Network {
        url,
        attempts,
        source,
    }
}
