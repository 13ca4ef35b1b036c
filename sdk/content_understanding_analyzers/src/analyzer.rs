//! Analysis job client for the Azure AI Content Understanding analyzers API.
//!
//! Analysis is asynchronous: a submit request returns `202 Accepted` with an
//! `Operation-Location` header, and the client polls that URL at a fixed
//! interval until the job succeeds, fails, or the deadline passes.
//!
//! There is no cancellation: dropping the future stops the local wait, but the
//! remote job keeps running to completion.
//!
//! ## Example
//!
//! ```rust,no_run
//! use content_understanding_core::client::ContentUnderstandingClient;
//! use content_understanding_core::auth::ContentUnderstandingCredential;
//! use content_understanding_analyzers::analyzer::{self, AnalysisRequest, PollOptions};
//! use content_understanding_analyzers::models::PREBUILT_IMAGE_ANALYZER;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ContentUnderstandingClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(ContentUnderstandingCredential::api_key("your-key"))
//!     .build()?;
//!
//! let request = AnalysisRequest::builder()
//!     .analyzer_id(PREBUILT_IMAGE_ANALYZER)
//!     .url("https://example.com/team.jpg")
//!     .build()?;
//!
//! let operation = analyzer::submit(&client, &request).await?;
//! let result = analyzer::poll_until_complete(&client, &operation, &PollOptions::default()).await?;
//! println!("{:?}", result.description());
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;
use std::time::Duration;

use base64::Engine as _;
use content_understanding_core::client::ContentUnderstandingClient;
use content_understanding_core::error::{ContentUnderstandingError, ContentUnderstandingResult};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::models::{api_version_query, detect_content_type, ANALYZERS_PATH};

/// Default spacing between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default deadline for an analysis job.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// What is sent to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    /// A publicly reachable URL the service downloads itself.
    Url(String),
    /// Raw bytes uploaded inline as base64.
    Content {
        bytes: Vec<u8>,
        file_name: String,
        content_type: String,
    },
}

/// A request to analyze a document or image.
///
/// ```rust
/// use content_understanding_analyzers::analyzer::AnalysisRequest;
/// use content_understanding_analyzers::models::PREBUILT_DOCUMENT_ANALYZER;
///
/// let request = AnalysisRequest::builder()
///     .analyzer_id(PREBUILT_DOCUMENT_ANALYZER)
///     .content(b"hello".to_vec(), "hello.txt")
///     .build()
///     .expect("valid request");
/// assert_eq!(request.analyzer_id, PREBUILT_DOCUMENT_ANALYZER);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Analyzer (or registered schema) identifier.
    pub analyzer_id: String,
    target: AnalysisTarget,
    schema_version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnalysisBody<'a> {
    Url {
        url: &'a str,
    },
    Documents {
        #[serde(rename = "schemaId")]
        schema_id: &'a str,
        #[serde(rename = "schemaVersion", skip_serializing_if = "Option::is_none")]
        schema_version: Option<&'a str>,
        documents: Vec<DocumentPayload<'a>>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPayload<'a> {
    document_id: String,
    content_type: &'a str,
    content: String,
}

impl AnalysisRequest {
    /// Creates a new builder for an analysis request.
    pub fn builder() -> AnalysisRequestBuilder {
        AnalysisRequestBuilder::default()
    }

    /// The target being analyzed.
    pub fn target(&self) -> &AnalysisTarget {
        &self.target
    }

    fn body(&self) -> AnalysisBody<'_> {
        match &self.target {
            AnalysisTarget::Url(url) => AnalysisBody::Url { url },
            AnalysisTarget::Content {
                bytes,
                file_name,
                content_type,
            } => AnalysisBody::Documents {
                schema_id: &self.analyzer_id,
                schema_version: self.schema_version.as_deref(),
                documents: vec![DocumentPayload {
                    document_id: document_id(file_name, chrono::Utc::now()),
                    content_type,
                    content: base64::engine::general_purpose::STANDARD.encode(bytes),
                }],
            },
        }
    }

    fn path(&self, client: &ContentUnderstandingClient) -> String {
        format!(
            "{ANALYZERS_PATH}/{}:analyze?{}",
            self.analyzer_id,
            api_version_query(client)
        )
    }
}

/// Identifier of an uploaded document: `{file_name}_{YYYYmmdd_HHMMSS}`.
fn document_id(file_name: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    format!("{file_name}_{}", now.format("%Y%m%d_%H%M%S"))
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

/// Builder for [`AnalysisRequest`].
#[derive(Debug, Default)]
pub struct AnalysisRequestBuilder {
    analyzer_id: Option<String>,
    url: Option<String>,
    content: Option<(Vec<u8>, String)>,
    content_type: Option<String>,
    schema_version: Option<String>,
}

impl AnalysisRequestBuilder {
    /// Sets the analyzer or schema identifier (required).
    pub fn analyzer_id(mut self, analyzer_id: impl Into<String>) -> Self {
        self.analyzer_id = Some(analyzer_id.into());
        self
    }

    /// Analyze the resource at `url`.
    ///
    /// Mutually exclusive with [`content`](Self::content).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Analyze inline bytes named `file_name`.
    ///
    /// Mutually exclusive with [`url`](Self::url).
    pub fn content(mut self, bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        self.content = Some((bytes, file_name.into()));
        self
    }

    /// Overrides the MIME type detected from the file name.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the schema version sent with inline documents.
    pub fn schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns [`ContentUnderstandingError::Builder`] if:
    /// - `analyzer_id` is missing, empty, or contains characters other than
    ///   ASCII letters, digits, `-`, `_`, `.` and `~`
    /// - neither or both of `url` and `content` are set
    /// - the content file name is empty
    pub fn build(self) -> ContentUnderstandingResult<AnalysisRequest> {
        let analyzer_id = self
            .analyzer_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ContentUnderstandingError::Builder("analyzer_id is required".into()))?;

        // The id is a single path segment in front of `:analyze`.
        if !analyzer_id.bytes().all(is_unreserved) {
            return Err(ContentUnderstandingError::Builder(format!(
                "analyzer_id {analyzer_id:?} must contain only ASCII letters, digits, '-', '_', '.' or '~'"
            )));
        }

        let url = self.url.filter(|u| !u.is_empty());

        let target = match (url, self.content) {
            (None, None) => {
                return Err(ContentUnderstandingError::Builder(
                    "target is required: set url or content".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ContentUnderstandingError::Builder(
                    "only one target allowed: set url or content, not both".into(),
                ))
            }
            (Some(url), None) => AnalysisTarget::Url(url),
            (None, Some((_, file_name))) if file_name.is_empty() => {
                return Err(ContentUnderstandingError::Builder(
                    "content file_name is required".into(),
                ))
            }
            (None, Some((bytes, file_name))) => {
                let content_type = self
                    .content_type
                    .unwrap_or_else(|| detect_content_type(&file_name).to_string());
                AnalysisTarget::Content {
                    bytes,
                    file_name,
                    content_type,
                }
            }
        };

        Ok(AnalysisRequest {
            analyzer_id,
            target,
            schema_version: self.schema_version,
        })
    }
}

// ---------------------------------------------------------------------------
// Operation types
// ---------------------------------------------------------------------------

/// The status of an asynchronous analysis operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// The job is queued.
    NotStarted,
    /// The job is in progress.
    Running,
    /// The job completed and the result is available.
    Succeeded,
    /// The job failed.
    Failed,
}

impl OperationStatus {
    /// Returns `true` if the status is terminal (succeeded or failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl FromStr for OperationStatus {
    type Err = ContentUnderstandingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notstarted" => Ok(Self::NotStarted),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(ContentUnderstandingError::Protocol(format!(
                "unknown operation status: {s:?}"
            ))),
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Handle of a submitted analysis job.
#[derive(Debug, Clone)]
pub struct AnalysisOperation {
    /// The URL to poll for the job status.
    pub operation_location: String,
    /// Service request id, when the service returned one.
    pub request_id: Option<String>,
}

/// One observation of an operation's status.
#[derive(Debug, Clone)]
pub struct OperationSnapshot {
    /// Parsed status.
    pub status: OperationStatus,
    /// The full JSON body returned by the status endpoint.
    pub payload: Value,
}

/// Timing parameters for [`poll_until_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Flat spacing between status checks.
    pub interval: Duration,
    /// Deadline measured from the first status check.
    pub max_wait: Duration,
}

impl PollOptions {
    /// Sets the spacing between status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the deadline.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// The terminal payload of a succeeded analysis.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    payload: Value,
    /// Number of status checks issued.
    pub polls: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

impl AnalysisResult {
    /// Wraps a terminal payload.
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            polls: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// The raw JSON payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the result, returning the raw JSON payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// The first entry of `result.contents`, if any.
    pub fn first_content(&self) -> Option<&Value> {
        self.payload
            .pointer("/result/contents")
            .and_then(Value::as_array)
            .and_then(|contents| contents.first())
    }

    /// Free-text description of the analyzed content.
    ///
    /// Prefers the `Summary` field's `valueString` and falls back to the
    /// content's markdown.
    pub fn description(&self) -> Option<&str> {
        let content = self.first_content()?;
        content
            .pointer("/fields/Summary/valueString")
            .and_then(Value::as_str)
            .or_else(|| content.get("markdown").and_then(Value::as_str))
    }

    /// Extracted text of the analyzed document, if the service returned any.
    pub fn text(&self) -> Option<&str> {
        self.first_content()
            .and_then(|content| content.get("markdown"))
            .or_else(|| self.payload.pointer("/analyzeResult/content"))
            .and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

/// Submit an analysis request.
///
/// The request is sent once. Anything other than `202 Accepted` is reported as
/// [`ContentUnderstandingError::Submission`] with the status and body.
///
/// # Tracing
///
/// Emits a span named `content_understanding::analyzer::submit` with field `analyzer_id`.
#[tracing::instrument(
    name = "content_understanding::analyzer::submit",
    skip(client, request),
    fields(analyzer_id = %request.analyzer_id)
)]
pub async fn submit(
    client: &ContentUnderstandingClient,
    request: &AnalysisRequest,
) -> ContentUnderstandingResult<AnalysisOperation> {
    tracing::debug!("submitting analysis request");

    let response = client.post_once(&request.path(client), &request.body()).await?;

    let status = response.status().as_u16();
    if status != 202 {
        let body = response.text().await.unwrap_or_default();
        return Err(ContentUnderstandingError::Submission {
            status,
            body: ContentUnderstandingClient::truncate_message(&body),
        });
    }

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let operation_location = header("Operation-Location").ok_or_else(|| {
        ContentUnderstandingError::Protocol(
            "Operation-Location header missing from 202 response".into(),
        )
    })?;
    let request_id = header("request-id").or_else(|| header("apim-request-id"));

    tracing::debug!(
        operation_location = %operation_location,
        request_id = ?request_id,
        "analysis accepted"
    );

    Ok(AnalysisOperation {
        operation_location,
        request_id,
    })
}

/// Fetch the current status of an operation.
///
/// The `Operation-Location` URL is resolved against the client's endpoint, so
/// credentials are only ever sent to the configured host.
///
/// # Errors
///
/// - [`ContentUnderstandingError::Http`] for any reply other than `200`,
///   including error replies with a JSON `error` body
/// - [`ContentUnderstandingError::Protocol`] when the status is missing or unknown
///
/// # Tracing
///
/// Emits a span named `content_understanding::analyzer::get_status`.
#[tracing::instrument(
    name = "content_understanding::analyzer::get_status",
    skip(client),
    fields(operation_location = %operation_location)
)]
pub async fn get_status(
    client: &ContentUnderstandingClient,
    operation_location: &str,
) -> ContentUnderstandingResult<OperationSnapshot> {
    let parsed = url::Url::parse(operation_location).map_err(|e| {
        ContentUnderstandingError::invalid_endpoint_with_source(
            "failed to parse Operation-Location URL",
            e,
        )
    })?;

    let relative_path = match parsed.query() {
        Some(q) => format!("{}?{q}", parsed.path()),
        None => parsed.path().to_string(),
    };

    let response = client.get_once(&relative_path).await?;
    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(ContentUnderstandingError::http(
            status,
            ContentUnderstandingClient::truncate_message(&body),
        ));
    }

    let payload: Value = response.json().await?;
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ContentUnderstandingError::Protocol("status field missing from operation body".into())
        })?
        .parse::<OperationStatus>()?;

    tracing::trace!(%status, "operation status fetched");
    Ok(OperationSnapshot { status, payload })
}

/// Poll an operation until it succeeds, fails, or `options.max_wait` elapses.
///
/// The deadline is checked before every status call, so no call is issued
/// once it has passed. The interval is flat; there is no backoff growth.
///
/// # Errors
///
/// - [`ContentUnderstandingError::Analysis`] when the service reports `Failed`
/// - [`ContentUnderstandingError::Protocol`] on an unrecognised status
/// - [`ContentUnderstandingError::Timeout`] when the deadline passes
///
/// # Tracing
///
/// Emits a span named `content_understanding::analyzer::poll_until_complete`.
#[tracing::instrument(
    name = "content_understanding::analyzer::poll_until_complete",
    skip(client, operation),
    fields(operation_location = %operation.operation_location)
)]
pub async fn poll_until_complete(
    client: &ContentUnderstandingClient,
    operation: &AnalysisOperation,
    options: &PollOptions,
) -> ContentUnderstandingResult<AnalysisResult> {
    let start = Instant::now();
    let mut polls = 0u32;

    while start.elapsed() < options.max_wait {
        polls += 1;
        let snapshot = get_status(client, &operation.operation_location).await?;

        match snapshot.status {
            OperationStatus::Succeeded => {
                tracing::debug!(polls, "analysis succeeded");
                return Ok(AnalysisResult {
                    payload: snapshot.payload,
                    polls,
                    elapsed: start.elapsed(),
                });
            }
            OperationStatus::Failed => {
                tracing::debug!(polls, "analysis failed");
                return Err(failure_from_payload(&snapshot.payload));
            }
            OperationStatus::NotStarted | OperationStatus::Running => {
                tracing::trace!(status = %snapshot.status, polls, "operation in progress, waiting");
                tokio::time::sleep(options.interval).await;
            }
        }
    }

    Err(ContentUnderstandingError::Timeout {
        polls,
        waited: start.elapsed(),
    })
}

/// Submit a request and poll it to completion.
#[tracing::instrument(
    name = "content_understanding::analyzer::analyze",
    skip(client, request, options),
    fields(analyzer_id = %request.analyzer_id)
)]
pub async fn analyze(
    client: &ContentUnderstandingClient,
    request: &AnalysisRequest,
    options: &PollOptions,
) -> ContentUnderstandingResult<AnalysisResult> {
    let operation = submit(client, request).await?;
    poll_until_complete(client, &operation, options).await
}

fn failure_from_payload(payload: &Value) -> ContentUnderstandingError {
    let error = payload.get("error");
    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    ContentUnderstandingError::Analysis {
        code: field("code").unwrap_or_else(|| "AnalysisFailed".into()),
        message: field("message")
            .map(|m| ContentUnderstandingClient::truncate_message(&m))
            .unwrap_or_else(|| ContentUnderstandingClient::truncate_message(&payload.to_string())),
    }
}
