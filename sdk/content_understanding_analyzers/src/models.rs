//! Shared constants and helpers for the Content Understanding analyzers.

use content_understanding_core::client::ContentUnderstandingClient;

/// Prebuilt analyzer for general documents.
pub const PREBUILT_DOCUMENT_ANALYZER: &str = "prebuilt-documentAnalyzer";

/// Prebuilt analyzer producing a natural-language summary of an image.
pub const PREBUILT_IMAGE_ANALYZER: &str = "prebuilt-imageAnalyzer";

/// Path prefix of the analyzer endpoints.
pub(crate) const ANALYZERS_PATH: &str = "/contentunderstanding/analyzers";

/// Path of the schema authoring endpoints.
pub(crate) const SCHEMAS_PATH: &str = "/authoring/schemas";

/// Builds the `api-version` query parameter for the client's configured version.
pub(crate) fn api_version_query(client: &ContentUnderstandingClient) -> String {
    format!("api-version={}", client.api_version())
}

/// Returns the lowercase extension of `file_name`, if it has one.
///
/// ```rust
/// use content_understanding_analyzers::models::file_extension;
///
/// assert_eq!(file_extension("Report.PDF").as_deref(), Some("pdf"));
/// assert_eq!(file_extension("README"), None);
/// ```
pub fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

/// Detects the MIME type of a file from its extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn detect_content_type(file_name: &str) -> &'static str {
    let Some(ext) = file_extension(file_name) else {
        return "application/octet-stream";
    };

    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prebuilt_analyzer_constants() {
        assert_eq!(PREBUILT_DOCUMENT_ANALYZER, "prebuilt-documentAnalyzer");
        assert_eq!(PREBUILT_IMAGE_ANALYZER, "prebuilt-imageAnalyzer");
    }

    #[test]
    fn test_detect_content_type_known_extensions() {
        assert_eq!(detect_content_type("invoice.pdf"), "application/pdf");
        assert_eq!(detect_content_type("notes.TXT"), "text/plain");
        assert_eq!(detect_content_type("photo.jpeg"), "image/jpeg");
        assert_eq!(detect_content_type("scan.tif"), "image/tiff");
        assert_eq!(detect_content_type("page.htm"), "text/html");
        assert_eq!(
            detect_content_type("deck.pptx"),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
    }

    #[test]
    fn test_detect_content_type_defaults_to_octet_stream() {
        assert_eq!(detect_content_type("archive.zip"), "application/octet-stream");
        assert_eq!(detect_content_type("Makefile"), "application/octet-stream");
    }

    #[test]
    fn test_file_extension_uses_last_segment() {
        assert_eq!(file_extension("data.backup.CSV").as_deref(), Some("csv"));
        assert_eq!(file_extension("trailing."), Some(String::new()));
    }
}
