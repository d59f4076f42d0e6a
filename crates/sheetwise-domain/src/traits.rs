//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction core and
//! infrastructure. Implementations live in other crates and are constructed
//! by the host process, then injected.

use crate::{ChunkRecord, WebContext};
use async_trait::async_trait;
use std::fmt::Display;

/// Text completion capability
///
/// Implemented by the infrastructure layer (sheetwise-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for completion calls; its text is inspected for
    /// rate-limit wording, so implementations should keep it descriptive
    type Error: Display + Send + Sync + 'static;

    /// Complete a prompt and return the raw model output
    async fn complete(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Model identifier for reporting
    fn model_name(&self) -> &str {
        "llm"
    }
}

/// Similarity search over ingested document chunks
///
/// Implemented by the infrastructure layer (sheetwise-store)
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Error type for search operations
    type Error: Display + Send + Sync + 'static;

    /// Return up to `k` chunks ordered by relevance
    ///
    /// An empty index yields an empty vector, not an error.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ChunkRecord>, Self::Error>;
}

/// Producer of cleaned key/value text from supplier websites
#[async_trait]
pub trait WebSource: Send + Sync {
    /// Error type for lookups
    type Error: Display + Send + Sync + 'static;

    /// Look up web text for a part number; `None` when nothing is known
    async fn lookup(&self, part_number: Option<&str>) -> Result<Option<WebContext>, Self::Error>;
}
