//! Retrying HTTP client with typed error classification.

use std::time::{Duration, Instant};

use geostitch_core::ConnectorError;
use log::{debug, warn};
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use thiserror::Error;
use url::Url;

/// Default user agent for outbound requests.
pub const DEFAULT_USER_AGENT: &str = "geostitch/0.1 (geodata aggregation)";

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body excerpt carried in an error.
const ERROR_BODY_LIMIT: usize = 200;

/// Error raised when the underlying HTTP client cannot be built.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// TLS backend or client configuration failure.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Transport settings for [`ResilientClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Timeout applied to each attempt, connect included.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpClientConfig {
    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Bounded exponential backoff with jitter.
///
/// The delay before attempt `n + 1` is `base_delay * 2^(n - 1)` clamped to
/// `[base_delay, max_delay]`, plus a uniformly drawn jitter of at most
/// `max_jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Lower bound of the backoff.
    pub base_delay: Duration,
    /// Upper bound of the backoff, before jitter.
    pub max_delay: Duration,
    /// Upper bound of the random jitter.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the attempt cap. Zero is treated as one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff bounds.
    #[must_use]
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Set the jitter bound.
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Backoff after failed attempt `attempt` (1-based), without jitter.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
            .max(self.base_delay)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let bound = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if bound == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=bound)
        };
        self.backoff(attempt)
            .saturating_add(Duration::from_millis(jitter))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// One logical outbound call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    url: Url,
    query: Vec<(String, String)>,
    body: Option<(String, &'static str)>,
    idempotent: bool,
}

impl OutboundRequest {
    /// A `GET` request. Always safe to retry.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            query: Vec::new(),
            body: None,
            idempotent: true,
        }
    }

    /// A `POST` request with a text body. Not retried unless marked
    /// [`idempotent`](Self::idempotent).
    #[must_use]
    pub fn post(url: Url, body: impl Into<String>, content_type: &'static str) -> Self {
        Self {
            method: Method::POST,
            url,
            query: Vec::new(),
            body: Some((body.into(), content_type)),
            idempotent: false,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Declare whether replaying the body is harmless.
    #[must_use]
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Target URL without the query parameters.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Failure of a single attempt.
enum AttemptError {
    Retryable(String),
    Fatal(ConnectorError),
}

/// HTTP client that retries timeouts and 5xx responses.
///
/// 429 maps to [`ConnectorError::RateLimited`] and other 4xx statuses to
/// [`ConnectorError::InvalidParameter`], both without retrying. When the
/// attempts run out on timeouts or 5xx the last failure is reported as
/// [`ConnectorError::ServiceUnavailable`]. Everything else is
/// [`ConnectorError::Other`].
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: Client,
    config: HttpClientConfig,
    retry: RetryPolicy,
}

impl ResilientClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the TLS backend cannot be set up.
    pub fn new(config: HttpClientConfig, retry: RetryPolicy) -> Result<Self, ClientBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Transport settings in use.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Retry policy in use.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Execute `request` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ConnectorError`]; see the type docs.
    pub async fn execute(&self, request: &OutboundRequest) -> Result<Vec<u8>, ConnectorError> {
        let url = request.url.as_str();
        let attempts = if request.idempotent {
            self.retry.attempts()
        } else {
            1
        };
        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let outcome = self.attempt(request).await;
            let elapsed = started.elapsed();
            match outcome {
                Ok(body) => {
                    debug!(
                        "{} {url} attempt {attempt}/{attempts}: {} bytes in {elapsed:?}",
                        request.method,
                        body.len()
                    );
                    return Ok(body);
                }
                Err(AttemptError::Retryable(reason)) if attempt < attempts => {
                    let delay = self.retry.delay_with_jitter(attempt);
                    warn!(
                        "{} {url} attempt {attempt}/{attempts} failed ({reason}); retrying in {delay:?}",
                        request.method
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AttemptError::Retryable(reason)) => {
                    debug!(
                        "{} {url} attempt {attempt}/{attempts} failed ({reason}) in {elapsed:?}",
                        request.method
                    );
                    return Err(ConnectorError::ServiceUnavailable {
                        url: url.to_owned(),
                        reason,
                    });
                }
                Err(AttemptError::Fatal(err)) => {
                    debug!(
                        "{} {url} attempt {attempt}/{attempts} failed in {elapsed:?}: {err}",
                        request.method
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, request: &OutboundRequest) -> Result<Vec<u8>, AttemptError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .query(&request.query);
        if let Some((body, content_type)) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, *content_type)
                .body(body.clone());
        }
        let response = builder
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &request.url))?;
        let status = response.status();
        if status.is_success() {
            return response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|err| self.convert_reqwest_error(&err, &request.url));
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body, &request.url))
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> AttemptError {
        if error.is_timeout() {
            return AttemptError::Retryable(format!(
                "timed out after {}s",
                self.config.timeout.as_secs()
            ));
        }
        AttemptError::Fatal(ConnectorError::Other {
            url: url.as_str().to_owned(),
            message: error.to_string(),
        })
    }
}

fn classify_status(status: StatusCode, body: &str, request_url: &Url) -> AttemptError {
    let url = request_url.as_str().to_owned();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AttemptError::Fatal(ConnectorError::RateLimited { url });
    }
    if status.is_server_error() {
        return AttemptError::Retryable(format!("HTTP {}", status.as_u16()));
    }
    if status.is_client_error() {
        return AttemptError::Fatal(ConnectorError::InvalidParameter {
            url,
            status: status.as_u16(),
            message: body.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }
    AttemptError::Fatal(ConnectorError::Other {
        url,
        message: format!("unexpected HTTP status {}", status.as_u16()),
    })
}
