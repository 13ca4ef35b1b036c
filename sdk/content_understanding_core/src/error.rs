use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when interacting with the Content Understanding API.
#[derive(Error, Debug)]
pub enum ContentUnderstandingError {
    /// The service did not accept an analysis request with `202 Accepted`.
    #[error("analysis submission rejected: {status} - {body}")]
    Submission { status: u16, body: String },

    /// The service reported that the analysis job failed.
    #[error("analysis failed ({code}): {message}")]
    Analysis { code: String, message: String },

    /// The service replied with something outside the documented protocol,
    /// such as an unknown operation status or a missing `Operation-Location`.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The operation did not reach a terminal status before the deadline.
    #[error("analysis timed out after {polls} polls ({waited:?})")]
    Timeout { polls: u32, waited: Duration },

    /// The request failed due to an HTTP error.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The API returned a structured error response.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: url::ParseError,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// A request builder was given invalid or incomplete input.
    #[error("Invalid request: {0}")]
    Builder(String),

    /// A schema definition failed validation.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl ContentUnderstandingError {
    /// Create an [`Http`](Self::Http) error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an [`InvalidEndpoint`](Self::InvalidEndpoint) error keeping the parse failure as source.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source,
        }
    }

    /// Short machine-friendly label for the failure, used in logs and records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submission { .. } => "submission",
            Self::Analysis { .. } => "analysis",
            Self::Protocol(_) => "protocol",
            Self::Timeout { .. } => "timeout",
            Self::Http { .. } => "http",
            Self::Api { .. } => "api",
            Self::Auth(_) => "auth",
            Self::Serialization(_) => "serialization",
            Self::Request(_) => "request",
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::MissingConfig(_) => "missing_config",
            Self::Builder(_) => "builder",
            Self::InvalidSchema(_) => "invalid_schema",
        }
    }
}

/// Result type alias for Content Understanding operations.
pub type ContentUnderstandingResult<T> = std::result::Result<T, ContentUnderstandingError>;
