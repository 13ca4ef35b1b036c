//! Local best-effort text extraction.
//!
//! Used directly when no analyzer is configured, and as the degraded path when
//! the service cannot analyze a document. Always produces a well-formed result.

use content_understanding_analyzers::models::file_extension;

use crate::record::{truncate_chars, DocumentMetadata, ProcessingMethod};

/// Cap on text stored in `extractedText`.
pub const MAX_STORED_TEXT_CHARS: usize = 10_000;

/// Cap on the `Summary` stored after a failed analysis.
pub const MAX_SUMMARY_CHARS: usize = 1_000;

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "csv", "json"];

/// Text and metadata extracted without the service.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalExtraction {
    /// Decoded text, or a label describing binary content.
    pub text: String,
    /// Size, counts, and method.
    pub metadata: DocumentMetadata,
}

impl LocalExtraction {
    /// Text truncated for storage.
    pub fn stored_text(&self) -> String {
        truncate_chars(&self.text, MAX_STORED_TEXT_CHARS)
    }

    /// Short summary used in place of extracted fields.
    pub fn summary(&self) -> String {
        truncate_chars(&self.text, MAX_SUMMARY_CHARS)
    }
}

/// Decodes `content` as text when the extension suggests a text format.
///
/// Counts are computed over the full decoded text (or the binary label).
pub fn extract_locally(content: &[u8], file_name: &str) -> LocalExtraction {
    let extension = file_extension(file_name);
    let is_text = extension
        .as_deref()
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext));

    let text = if is_text {
        match std::str::from_utf8(content) {
            Ok(text) => text.to_string(),
            Err(err) => {
                tracing::debug!(file_name, error = %err, "content is not valid UTF-8");
                format!("Binary file that couldn't be decoded as text: {file_name}")
            }
        }
    } else {
        format!("Binary file: {file_name}")
    };

    let metadata = DocumentMetadata {
        file_extension: extension.unwrap_or_else(|| "unknown".to_string()),
        file_size_bytes: content.len() as u64,
        word_count: text.split_whitespace().count(),
        character_count: text.chars().count(),
        processing_method: ProcessingMethod::BasicTextExtraction,
        analyzer_id: None,
        fallback_reason: None,
    };

    LocalExtraction { text, metadata }
}
