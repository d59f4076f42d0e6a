//! Error types for document ingestion

use thiserror::Error;

/// Errors that can occur while ingesting documents
#[derive(Error, Debug)]
pub enum IngestError {
    /// File could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF text extraction failed
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// Invalid splitter or worker settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker task panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),
}
