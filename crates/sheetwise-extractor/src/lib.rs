//! Sheetwise Extractor
//!
//! Pulls a fixed battery of connector attributes out of datasheets, one LLM
//! call per attribute.
//!
//! # Architecture
//!
//! ```text
//! chunks ─► Context Formatter ─┐
//!                              ├─► Prompt Composer ─► LLM ─► Normalizer ─► Classifier ─► result
//! web text ────────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **Single-key JSON contract**: every prompt demands `{"<attribute>": "<value>"}`
//! - **Defensive parsing**: reasoning blocks, code fences and stray prose are stripped
//! - **Per-attribute resilience**: one failing call never sinks the batch
//! - **Pacing**: a configurable gap between consecutive calls
//! - **Web fallback**: supplier key/value text stands in where documents are silent
//! - **Session safety**: results from before a re-ingestion are never mixed in
//!
//! # Example Usage
//!
//! ```no_run
//! use sheetwise_extractor::{BatchRequest, Extractor, PipelineConfig};
//! use sheetwise_llm::MockProvider;
//! use sheetwise_store::DocumentIndex;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = DocumentIndex::open("sheetwise.db")?;
//! let extractor = Extractor::new(PipelineConfig::default())
//!     .with_llm(MockProvider::new(r#"{"Gender": "Female"}"#))
//!     .with_retriever(index);
//!
//! let request = BatchRequest::new().with_part_number("968970-1");
//! let report = extractor.run_batch(&request, &CancellationToken::new()).await?;
//!
//! for record in report.presentation() {
//!     println!("{} [{}]: {}", record.name, record.indicator, record.display_value);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod catalog;
mod classifier;
mod config;
mod context;
mod error;
mod extractor;
mod normalizer;
mod prompt;
mod session;
mod types;
mod web;


pub use catalog::{
    connector_attributes, AttributeCatalog, CONNECTOR_ATTRIBUTES, DIMENSION_ATTRIBUTES,
    UNKNOWN_DIMENSION,
};
pub use classifier::{
    classify, error_payload, is_not_found, is_rate_limit_message, DISPLAY_INVALID_JSON,
    DISPLAY_KEY_MISSING, DISPLAY_NO_COMPLETION, DISPLAY_RATE_LIMITED, NOT_FOUND_SENTINEL,
};
pub use config::{PipelineConfig, MAX_PACING_INTERVAL_SECS};
pub use context::format_context;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use normalizer::{normalize, Isolation, NormalizeStage, NormalizeTrace, Normalized};
pub use prompt::{retrieval_query, Framing, PromptBuilder, DOCUMENT_FRAMING, WEB_FRAMING};
pub use session::ResultBoard;
pub use types::{
    BatchMetadata, BatchReport, BatchRequest, ExtractionRequest, ExtractionStatus, Indicator,
    NormalizedResult, PresentationRecord, StatusCounts,
};
pub use web::{
    dedup_lines, flatten_product_json, key_value_lines, resolve_web_context, StaticWebSource,
    WebError,
};
