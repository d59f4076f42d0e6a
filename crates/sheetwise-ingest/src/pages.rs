//! Page text extraction and cleanup

use crate::IngestError;
use std::path::Path;

/// How a document's bytes are turned into pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// PDF, one entry per page
    Pdf,
    /// Plain text; form feeds separate pages
    Text,
}

impl DocumentFormat {
    /// Detect the format from a file name's extension
    pub fn from_name(name: &str) -> Self {
        let is_pdf = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            DocumentFormat::Pdf
        } else {
            DocumentFormat::Text
        }
    }
}

/// Collapse every whitespace run to a single space and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Raw page texts of a document, uncleaned
pub fn extract_pages(format: DocumentFormat, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| IngestError::Pdf(e.to_string())),
        DocumentFormat::Text => {
            let text = String::from_utf8_lossy(bytes);
            Ok(text.split('\u{c}').map(str::to_string).collect())
        }
    }
}
