//! Configuration for document ingestion

use crate::IngestError;

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between neighbouring chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 75;

/// Default number of documents parsed at once
pub const DEFAULT_MAX_CONCURRENT_DOCUMENTS: usize = 4;

/// Splitter and worker pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters carried over between neighbouring chunks
    pub chunk_overlap: usize,

    /// Documents parsed concurrently; independent of extraction pacing
    pub max_concurrent_documents: usize,
}

impl IngestConfig {
    /// Create a config with the default worker pool size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            max_concurrent_documents: DEFAULT_MAX_CONCURRENT_DOCUMENTS,
        }
    }

    /// Set the worker pool size
    pub fn with_max_concurrent_documents(mut self, workers: usize) -> Self {
        self.max_concurrent_documents = workers;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        if self.max_concurrent_documents == 0 {
            return Err(IngestError::Config(
                "max_concurrent_documents must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}
