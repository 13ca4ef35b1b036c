//! Document processing handler.
//!
//! A blob is analyzed by the service when a [`DocumentProcessor`] is available.
//! When the service path fails for any reason the failure is logged and the
//! local extractor produces the record instead, so a readable blob always ends
//! up `completed`. Only a blob that cannot be read yields an `error` record.
//!
//! ```rust,no_run
//! use content_understanding_core::client::ContentUnderstandingClient;
//! use content_understanding_functions::config::ProcessorConfig;
//! use content_understanding_functions::document::{handle_blob, DocumentProcessor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ContentUnderstandingClient::builder().build()?;
//! let processor = DocumentProcessor::new(client, ProcessorConfig::from_env()?);
//!
//! let content: &[u8] = b"hello world";
//! let record = handle_blob(Some(&processor), "documents/hello.txt", 11, content).await;
//! println!("{}", record.to_json());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use content_understanding_analyzers::analyzer::{self, AnalysisRequest, AnalysisResult};
use content_understanding_analyzers::fields::extract_document_fields;
use content_understanding_analyzers::models::file_extension;
use content_understanding_analyzers::schema::SchemaRegistry;
use content_understanding_core::client::ContentUnderstandingClient;
use content_understanding_core::error::{ContentUnderstandingError, ContentUnderstandingResult};
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ProcessorConfig;
use crate::fallback::{extract_locally, MAX_STORED_TEXT_CHARS};
use crate::record::{
    file_name_from_path, truncate_chars, DocumentMetadata, ProcessedDocument, ProcessingMethod,
};

/// Analyzes documents with the service, falling back to local extraction.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    client: ContentUnderstandingClient,
    config: ProcessorConfig,
    schemas: Arc<SchemaRegistry>,
}

impl DocumentProcessor {
    /// Creates a processor with its own schema registry.
    pub fn new(client: ContentUnderstandingClient, config: ProcessorConfig) -> Self {
        Self {
            client,
            config,
            schemas: Arc::new(SchemaRegistry::new()),
        }
    }

    /// Shares a schema registry with other processors.
    pub fn with_registry(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = schemas;
        self
    }

    /// The processor configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Resolves the analyzer id, registering the configured schema on first use.
    async fn analyzer_id(&self) -> ContentUnderstandingResult<String> {
        match &self.config.schema {
            Some(schema) => Ok(self
                .schemas
                .get_or_register(&self.client, schema)
                .await?
                .id),
            None => Ok(self.config.analyzer_id.clone()),
        }
    }

    /// Runs the service path only.
    pub async fn analyze(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> ContentUnderstandingResult<(String, AnalysisResult)> {
        let analyzer_id = self.analyzer_id().await?;

        let mut request = AnalysisRequest::builder()
            .analyzer_id(analyzer_id.as_str())
            .content(content.to_vec(), file_name);
        if let Some(schema) = &self.config.schema {
            request = request.schema_version(schema.version_or_default());
        }

        let result = analyzer::analyze(&self.client, &request.build()?, &self.config.poll).await?;
        Ok((analyzer_id, result))
    }

    /// Processes a document, degrading to local extraction if the service path fails.
    ///
    /// `blob_size` is the size reported by the trigger and becomes `blobSize`;
    /// `fileSizeBytes` in the metadata is the number of bytes actually read.
    #[tracing::instrument(
        name = "content_understanding::functions::process_document",
        skip(self, content),
        fields(size = content.len())
    )]
    pub async fn process(
        &self,
        file_name: &str,
        blob_size: u64,
        content: &[u8],
    ) -> ProcessedDocument {
        let processed_at = Utc::now();

        match self.analyze(file_name, content).await {
            Ok((analyzer_id, result)) => {
                tracing::info!(polls = result.polls, "document analyzed");
                from_analysis(file_name, blob_size, content, processed_at, &analyzer_id, &result)
            }
            Err(err) => {
                log_fallback(&err);
                from_fallback(file_name, blob_size, content, processed_at, &err)
            }
        }
    }
}

fn log_fallback(err: &ContentUnderstandingError) {
    match err {
        ContentUnderstandingError::Submission { status, .. } => {
            tracing::warn!(status, "analysis not accepted, using local extraction")
        }
        ContentUnderstandingError::Analysis { code, message } => {
            tracing::warn!(%code, %message, "analysis failed, using local extraction")
        }
        ContentUnderstandingError::Timeout { polls, waited } => {
            tracing::warn!(polls, ?waited, "analysis timed out, using local extraction")
        }
        ContentUnderstandingError::Protocol(detail) => {
            tracing::warn!(%detail, "unexpected service reply, using local extraction")
        }
        other => tracing::warn!(error = %other, "analysis unavailable, using local extraction"),
    }
}

fn from_analysis(
    file_name: &str,
    blob_size: u64,
    content: &[u8],
    processed_at: DateTime<Utc>,
    analyzer_id: &str,
    result: &AnalysisResult,
) -> ProcessedDocument {
    let text = result.text().unwrap_or_default();
    let fields = extract_document_fields(result);

    let metadata = DocumentMetadata {
        file_extension: file_extension(file_name).unwrap_or_else(|| "unknown".to_string()),
        file_size_bytes: content.len() as u64,
        word_count: text.split_whitespace().count(),
        character_count: text.chars().count(),
        processing_method: ProcessingMethod::AiContentUnderstanding,
        analyzer_id: Some(analyzer_id.to_string()),
        fallback_reason: None,
    };

    let mut record = ProcessedDocument::completed(file_name, blob_size, processed_at, metadata);
    if !text.is_empty() {
        record.extracted_text = Some(truncate_chars(text, MAX_STORED_TEXT_CHARS));
    }
    record.extracted_data = Some(fields.values);
    record.confidence_scores = Some(fields.confidence);
    record
}

fn from_fallback(
    file_name: &str,
    blob_size: u64,
    content: &[u8],
    processed_at: DateTime<Utc>,
    err: &ContentUnderstandingError,
) -> ProcessedDocument {
    let extraction = extract_locally(content, file_name);

    let mut summary = Map::new();
    summary.insert("Summary".to_string(), Value::String(extraction.summary()));

    let stored_text = extraction.stored_text();
    let mut metadata = extraction.metadata;
    metadata.processing_method = ProcessingMethod::BasicTextExtractionFallback;
    metadata.fallback_reason = Some(err.kind().to_string());

    let mut record = ProcessedDocument::completed(file_name, blob_size, processed_at, metadata);
    record.extracted_text = Some(stored_text);
    record.extracted_data = Some(summary);
    record
}

/// Processes a document with local extraction only.
pub fn process_basic(file_name: &str, blob_size: u64, content: &[u8]) -> ProcessedDocument {
    let extraction = extract_locally(content, file_name);
    let stored = extraction.stored_text();

    let mut record =
        ProcessedDocument::completed(file_name, blob_size, Utc::now(), extraction.metadata);
    record.extracted_text = Some(stored);
    record
}

/// Handles an uploaded blob.
///
/// `blob_path` is the path inside the container; the record uses its last
/// segment as the file name. `declared_size` is the size reported by the
/// trigger and becomes `blobSize` on every record. Without a processor, only local
/// extraction runs.
#[tracing::instrument(
    name = "content_understanding::functions::handle_blob",
    skip(processor, blob_path, reader),
    fields(blob_path = %blob_path)
)]
pub async fn handle_blob<R>(
    processor: Option<&DocumentProcessor>,
    blob_path: &str,
    declared_size: u64,
    mut reader: R,
) -> ProcessedDocument
where
    R: AsyncRead + Unpin,
{
    let file_name = file_name_from_path(blob_path);
    tracing::info!(file_name, "processing blob");

    let mut content = Vec::new();
    if let Err(err) = reader.read_to_end(&mut content).await {
        tracing::error!(error = %err, "failed to read blob");
        return ProcessedDocument::failed(file_name, declared_size, Utc::now(), err);
    }

    let record = match processor {
        Some(processor) => processor.process(file_name, declared_size, &content).await,
        None => process_basic(file_name, declared_size, &content),
    };

    tracing::info!(id = %record.id, "document processed");
    record
}
