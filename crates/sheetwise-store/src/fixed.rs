//! Fixed-result retriever for fixtures and tests

use crate::StoreError;
use async_trait::async_trait;
use sheetwise_domain::{ChunkRecord, Retriever};
use std::sync::{Arc, Mutex};

/// Retriever that returns the same chunks for every query
///
/// Records the queries it receives. Clones share the query log.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    chunks: Vec<ChunkRecord>,
    failure: Option<String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticRetriever {
    /// Serve `chunks` (truncated to `k`) for every query
    pub fn new(chunks: Vec<ChunkRecord>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    /// A retriever over an empty index
    pub fn empty() -> Self {
        Self::default()
    }

    /// A retriever whose every search fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Queries received so far, oldest first
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    type Error = StoreError;

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ChunkRecord>, Self::Error> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }

        if let Some(message) = &self.failure {
            return Err(StoreError::Unavailable(message.clone()));
        }

        Ok(self.chunks.iter().take(k).cloned().collect())
    }
}
