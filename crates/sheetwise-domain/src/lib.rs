//! Sheetwise Domain Layer
//!
//! Core vocabulary of the datasheet extraction pipeline. Everything else in
//! the workspace depends on the types and capability traits defined here.
//!
//! ## Key Concepts
//!
//! - **Attribute**: one named fact to extract about a connector, with its
//!   extraction instructions
//! - **Chunk**: a piece of document text with source/page provenance
//! - **Context source**: whether grounding comes from documents or from web
//!   key/value text
//! - **Session**: the span between two index rebuilds; results belong to one
//!
//! ## Architecture
//!
//! - Only `uuid` and `async-trait` as dependencies
//! - Infrastructure implementations (LLM clients, retrievers) live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod chunk;
pub mod session;
pub mod traits;

// Re-exports for convenience
pub use attribute::{AttributeSpec, ContextSource};
pub use chunk::{ChunkRecord, WebContext};
pub use session::SessionId;
pub use traits::{LlmProvider, Retriever, WebSource};
