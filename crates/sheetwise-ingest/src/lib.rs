//! Sheetwise Ingestion
//!
//! Turns datasheets into chunks ready for the document index.
//!
//! # Pipeline
//!
//! ```text
//! PDF bytes → pages → cleaned text → overlapping chunks (with page/offset)
//! ```
//!
//! Documents are processed in parallel on blocking threads, bounded by
//! `IngestConfig::max_concurrent_documents`. This budget is separate from
//! anything the extraction stage does.
//!
//! # Example
//!
//! ```no_run
//! use sheetwise_ingest::{IngestConfig, Ingestor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ingestor = Ingestor::new(IngestConfig::default())?;
//! let report = ingestor.ingest_paths(&["datasheet.pdf"]).await;
//! println!("{} chunks", report.chunks.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod pages;
mod pipeline;
mod splitter;

pub use config::{
    IngestConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_DOCUMENTS,
};
pub use error::IngestError;
pub use pages::{clean_text, DocumentFormat};
pub use pipeline::{DocumentOutcome, IngestReport, Ingestor, SourceDocument};
pub use splitter::{RecursiveSplitter, TextSpan};
