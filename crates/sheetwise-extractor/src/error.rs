//! Error types for the extractor
//!
//! Only batch-level failures live here. Anything that goes wrong for a single
//! attribute becomes a `NormalizedResult` instead.

use thiserror::Error;

/// Errors that abort a whole batch before (or instead of) per-attribute work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    /// No completion provider was configured
    #[error("No LLM provider configured")]
    MissingLlm,

    /// Neither a document retriever nor web text is available
    #[error("No context available: configure a document index or supply web text")]
    MissingContext,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Nothing to extract
    #[error("No attributes selected for extraction")]
    EmptyBatch,

    /// Attribute filter named something outside the catalog
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The document set changed while the batch was running
    #[error("Session {0} was replaced; results discarded")]
    SessionInvalidated(String),
}
