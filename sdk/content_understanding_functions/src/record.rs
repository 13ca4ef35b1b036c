//! The processed-document record handed to the document store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome recorded for a processed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// The primary analysis or the local fallback produced a result.
    Completed,
    /// Processing failed before any extraction could run.
    Error,
}

/// How the extracted content was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    /// Extracted by the Content Understanding service.
    AiContentUnderstanding,
    /// Local text decoding only.
    BasicTextExtraction,
    /// Local text decoding after the service path failed.
    BasicTextExtractionFallback,
}

/// Descriptive metadata stored with every completed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_extension: String,
    pub file_size_bytes: u64,
    pub word_count: usize,
    pub character_count: usize,
    pub processing_method: ProcessingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// A processed document, shaped for the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    pub id: String,
    pub original_file_name: String,
    pub blob_size: u64,
    pub processed_timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_scores: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessedDocument {
    /// A completed record with no extracted content yet.
    pub(crate) fn completed(
        file_name: &str,
        blob_size: u64,
        processed_at: DateTime<Utc>,
        metadata: DocumentMetadata,
    ) -> Self {
        let timestamp = format_timestamp(processed_at);
        Self {
            id: record_id(file_name, &timestamp),
            original_file_name: file_name.to_string(),
            blob_size,
            processed_timestamp: timestamp,
            extracted_text: None,
            extracted_data: None,
            confidence_scores: None,
            metadata: Some(metadata),
            processing_status: ProcessingStatus::Completed,
            error: None,
        }
    }

    /// An error record for a blob that could not be processed at all.
    pub fn failed(
        file_name: &str,
        blob_size: u64,
        processed_at: DateTime<Utc>,
        error: impl std::fmt::Display,
    ) -> Self {
        let timestamp = format_timestamp(processed_at);
        Self {
            id: record_id(&format!("{file_name}_error"), &timestamp),
            original_file_name: file_name.to_string(),
            blob_size,
            processed_timestamp: timestamp,
            extracted_text: None,
            extracted_data: None,
            confidence_scores: None,
            metadata: None,
            processing_status: ProcessingStatus::Error,
            error: Some(error.to_string()),
        }
    }

    /// Serializes the record as the JSON document sent to the store.
    pub fn to_json(&self) -> Value {
        // Every field is a string, number, map, or enum; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// ISO-8601 timestamp with microseconds, as stored in `processedTimestamp`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Record id: `{prefix}_{timestamp}` with `:` and `.` replaced by `-`.
pub fn record_id(prefix: &str, timestamp: &str) -> String {
    format!("{prefix}_{}", timestamp.replace([':', '.'], "-"))
}

/// Last segment of a blob path, e.g. `documents/2024/report.pdf` -> `report.pdf`.
pub fn file_name_from_path(blob_path: &str) -> &str {
    blob_path.rsplit('/').next().unwrap_or(blob_path)
}

/// Truncates `text` to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
