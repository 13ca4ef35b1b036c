//! HTTP client for Azure AI Content Understanding.
//!
//! This module provides [`ContentUnderstandingClient`], the entry point shared
//! by the analyzer and handler crates. The client handles authentication,
//! HTTP transport, retries, and endpoint management.
//!
//! # Examples
//!
//! ## Using a subscription key
//! ```rust,no_run
//! use content_understanding_core::client::ContentUnderstandingClient;
//! use content_understanding_core::auth::ContentUnderstandingCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ContentUnderstandingClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(ContentUnderstandingCredential::api_key("your-key"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## From the environment
//! ```rust,no_run
//! use content_understanding_core::client::ContentUnderstandingClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads AI_CONTENT_UNDERSTANDING_ENDPOINT and AI_CONTENT_UNDERSTANDING_KEY.
//! let client = ContentUnderstandingClient::builder().build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::ContentUnderstandingCredential;
use crate::error::{ContentUnderstandingError, ContentUnderstandingResult};
use reqwest::Client as HttpClient;
use url::Url;

use std::time::Duration;

/// Environment variable holding the service endpoint.
pub const ENDPOINT_ENV: &str = "AI_CONTENT_UNDERSTANDING_ENDPOINT";

/// Default API version for Content Understanding.
pub const DEFAULT_API_VERSION: &str = "2025-05-01-preview";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
///
/// Applies to [`ContentUnderstandingClient::get`] and
/// [`ContentUnderstandingClient::post`]. Long-running operation calls use the
/// `*_once` variants and are never retried here.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt + 1`, with ±25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff * 2_u32.saturating_pow(attempt);
        let jitter = 0.75 + fastrand::f64() * 0.5;
        base.mul_f64(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// The base client for interacting with the Content Understanding API.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct ContentUnderstandingClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: ContentUnderstandingCredential,
    pub(crate) api_version: String,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing a [`ContentUnderstandingClient`].
///
/// Use [`ContentUnderstandingClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ContentUnderstandingClientBuilder {
    endpoint: Option<String>,
    credential: Option<ContentUnderstandingCredential>,
    api_version: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ContentUnderstandingClient {
    /// Create a new builder for configuring a `ContentUnderstandingClient`.
    pub fn builder() -> ContentUnderstandingClientBuilder {
        ContentUnderstandingClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the API version being used.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build a full URL for an API path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined to the endpoint URL.
    pub fn url(&self, path: &str) -> ContentUnderstandingResult<Url> {
        self.endpoint.join(path).map_err(|e| {
            ContentUnderstandingError::invalid_endpoint_with_source("failed to construct URL", e)
        })
    }

    /// Send a GET request with automatic retry on transient errors.
    ///
    /// Retries on retriable HTTP errors (429, 500, 502, 503, 504) with exponential backoff.
    pub async fn get(&self, path: &str) -> ContentUnderstandingResult<reqwest::Response> {
        let url = self.url(path)?;
        self.execute(self.retry_policy.max_retries, || self.http.get(url.clone()))
            .await
    }

    /// Send a POST request with a JSON body and automatic retry on transient errors.
    pub async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> ContentUnderstandingResult<reqwest::Response> {
        let url = self.url(path)?;
        self.execute(self.retry_policy.max_retries, || {
            self.http.post(url.clone()).json(body)
        })
        .await
    }

    /// Send a single GET request without retries and without status checking.
    ///
    /// Used by status polling, where the caller maps every non-200 reply itself.
    pub async fn get_once(&self, path: &str) -> ContentUnderstandingResult<reqwest::Response> {
        let url = self.url(path)?;
        let (header, value) = self.credential.resolve()?;
        let response = self.http.get(url).header(header, value).send().await?;
        Ok(response)
    }

    /// Send a single POST request without retries and without status checking.
    ///
    /// Used where the caller must inspect the exact status, such as the
    /// `202 Accepted` handshake of long-running operations.
    pub async fn post_once<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> ContentUnderstandingResult<reqwest::Response> {
        let url = self.url(path)?;
        let (header, value) = self.credential.resolve()?;
        let response = self
            .http
            .post(url)
            .header(header, value)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    async fn execute<F>(
        &self,
        max_retries: u32,
        request: F,
    ) -> ContentUnderstandingResult<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let (header, value) = self.credential.resolve()?;
        let mut attempt = 0u32;

        loop {
            let response = request().header(header, &value).send().await?;
            let status = response.status().as_u16();

            if response.status().is_success() {
                return Ok(response);
            }

            if !is_retriable_status(status) || attempt >= max_retries {
                return Self::check_response(response).await;
            }

            let backoff = self.retry_policy.backoff(attempt);
            tracing::debug!(status, attempt, ?backoff, "retriable response, backing off");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Maximum length for error messages to prevent sensitive data leaks.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Replace the value following each `marker` with `[REDACTED]`.
    fn redact_after(text: &str, marker: &str) -> String {
        const REDACTED: &str = "[REDACTED]";
        let mut result = text.to_string();
        let mut search_start = 0;

        while let Some(relative_pos) = result[search_start..].find(marker) {
            let mut value_start = search_start + relative_pos + marker.len();

            // Skip separators such as `: "` between a header name and its value.
            value_start += result[value_start..]
                .find(|c: char| !matches!(c, ':' | '=' | ' ' | '"' | '\''))
                .unwrap_or(result.len() - value_start);

            if result[value_start..].starts_with(REDACTED) {
                search_start = value_start + REDACTED.len();
                continue;
            }

            let value_end = result[value_start..]
                .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '}'))
                .map(|pos| value_start + pos)
                .unwrap_or(result.len());

            if value_end > value_start {
                result.replace_range(value_start..value_end, REDACTED);
                search_start = value_start + REDACTED.len();
            } else {
                search_start = value_start;
            }

            if search_start >= result.len() {
                break;
            }
        }

        result
    }

    /// Sanitize error messages by removing bearer tokens and subscription keys.
    pub(crate) fn sanitize_error_message(msg: &str) -> String {
        let redacted = Self::redact_after(msg, "Bearer ");
        Self::redact_after(&redacted, crate::auth::SUBSCRIPTION_KEY_HEADER)
    }

    /// Sanitize a message and truncate it if it exceeds the maximum length.
    pub fn truncate_message(msg: &str) -> String {
        let sanitized = Self::sanitize_error_message(msg);

        match sanitized.char_indices().nth(Self::MAX_ERROR_MESSAGE_LEN) {
            Some((cut, _)) => format!("{}... (truncated)", &sanitized[..cut]),
            None => sanitized,
        }
    }

    /// Check the response status and return an error if not successful.
    async fn check_response(
        response: reqwest::Response,
    ) -> ContentUnderstandingResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(error) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(err_obj) = error.get("error") {
                return Err(ContentUnderstandingError::Api {
                    code: err_obj
                        .get("code")
                        .and_then(|c| c.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    message: Self::truncate_message(
                        err_obj
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or(&body),
                    ),
                });
            }
        }

        Err(ContentUnderstandingError::http(
            status,
            Self::truncate_message(&body),
        ))
    }
}

impl ContentUnderstandingClientBuilder {
    /// Set the Content Understanding endpoint URL, e.g.
    /// `https://<resource-name>.cognitiveservices.azure.com`.
    ///
    /// If not set, the builder reads `AI_CONTENT_UNDERSTANDING_ENDPOINT`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder uses [`ContentUnderstandingCredential::from_env()`].
    pub fn credential(mut self, credential: ContentUnderstandingCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the API version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`].
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** timeouts configured on this builder are ignored when a custom
    /// client is provided.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout covering the whole request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ContentUnderstandingClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint is provided and `AI_CONTENT_UNDERSTANDING_ENDPOINT` is not set
    /// - The endpoint URL is invalid
    /// - No credential is provided and none is found in the environment
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> ContentUnderstandingResult<ContentUnderstandingClient> {
        let http = match self.http_client {
            Some(http) => http,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_ENV).ok().filter(|e| !e.is_empty()))
            .ok_or_else(|| {
                ContentUnderstandingError::MissingConfig(format!(
                    "endpoint is required. Set it via builder or {ENDPOINT_ENV} env var."
                ))
            })?;

        let endpoint = Url::parse(&endpoint_str).map_err(|e| {
            ContentUnderstandingError::invalid_endpoint_with_source("invalid endpoint URL", e)
        })?;

        let credential = match self.credential {
            Some(credential) => credential,
            None => ContentUnderstandingCredential::from_env()?,
        };

        Ok(ContentUnderstandingClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}
