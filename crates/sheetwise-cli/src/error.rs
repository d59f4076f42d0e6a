//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion provider error
    #[error("LLM error: {0}")]
    Llm(#[from] sheetwise_llm::LlmError),

    /// Chunk store error
    #[error("Store error: {0}")]
    Store(#[from] sheetwise_store::StoreError),

    /// Ingestion error
    #[error("Ingestion error: {0}")]
    Ingest(#[from] sheetwise_ingest::IngestError),

    /// Batch-level extraction error
    #[error("Extraction error: {0}")]
    Extractor(#[from] sheetwise_extractor::ExtractorError),

    /// Web text could not be prepared
    #[error("Web text error: {0}")]
    Web(#[from] sheetwise_extractor::WebError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
