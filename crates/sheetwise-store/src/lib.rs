//! Sheetwise Storage Layer
//!
//! Persists document chunks and serves similarity search over them.
//!
//! # Architecture
//!
//! - SQLite holds chunk text and provenance (source, page, offset)
//! - An in-memory HNSW index holds chunk embeddings, rebuilt from SQLite
//!   on open and after every replacement
//! - A local hashing embedding model turns text into vectors
//!
//! Both `DocumentIndex` and `StaticRetriever` implement the `Retriever`
//! trait from `sheetwise-domain`.
//!
//! # Examples
//!
//! ```no_run
//! use sheetwise_domain::ChunkRecord;
//! use sheetwise_store::DocumentIndex;
//!
//! let index = DocumentIndex::in_memory().unwrap();
//! index.replace_all(&[ChunkRecord::new("Material: PA66-GF30", "housing.pdf", 0)]).unwrap();
//! let hits = index.search_chunks("material", 3).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod fixed;
pub mod vector_index;

use async_trait::async_trait;
use embedding::{EmbeddingError, EmbeddingModel, HashingEmbeddingModel};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sheetwise_domain::{ChunkRecord, Retriever, SessionId};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};
use vector_index::{ChunkKey, VectorIndex, VectorIndexError};

pub use fixed::StaticRetriever;

/// Default HNSW search breadth
const DEFAULT_EF_SEARCH: usize = 64;

const SESSION_KEY: &str = "session";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector index error
    #[error("Index error: {0}")]
    Index(#[from] VectorIndexError),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Retriever cannot serve requests
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),
}

/// Per-source chunk counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    /// Source identifier (file name)
    pub source: String,
    /// Number of chunks from this source
    pub chunks: usize,
    /// Number of distinct pages that produced chunks
    pub pages: usize,
}

/// Snapshot of what the index holds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    /// Total chunks in SQLite
    pub total_chunks: usize,
    /// Chunks that made it into the vector index
    pub indexed_chunks: usize,
    /// Session created by the last replacement, if any
    pub session: Option<String>,
    /// Breakdown by source file
    pub sources: Vec<SourceSummary>,
}

/// SQLite-backed chunk store with HNSW similarity search
///
/// The connection sits behind a mutex so the index can be shared across
/// tasks; searches hold the lock only while rows are fetched.
pub struct DocumentIndex<E = HashingEmbeddingModel> {
    conn: Mutex<Connection>,
    index: VectorIndex,
    embedder: E,
    ef_search: usize,
}

impl DocumentIndex<HashingEmbeddingModel> {
    /// Open (or create) an index at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::with_model(path, HashingEmbeddingModel::default())
    }

    /// Create an empty in-memory index
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }
}

impl<E: EmbeddingModel> DocumentIndex<E> {
    /// Open an index with a specific embedding model
    pub fn with_model<P: AsRef<Path>>(path: P, embedder: E) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;

        let store = Self {
            conn: Mutex::new(conn),
            index: VectorIndex::new(embedder.dimension()),
            embedder,
            ef_search: DEFAULT_EF_SEARCH,
        };
        store.rebuild_index()?;
        Ok(store)
    }

    /// Set the HNSW search breadth
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search.max(1);
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::InvalidData("connection lock poisoned".to_string()))
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn insert_chunk(conn: &Connection, chunk: &ChunkRecord, created_at: i64) -> Result<ChunkKey, StoreError> {
        conn.execute(
            "INSERT INTO chunks (source, page, chunk_index, start_offset, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.source,
                chunk.page.map(i64::from),
                chunk.chunk_index as i64,
                chunk.start_offset.map(|offset| offset as i64),
                chunk.text,
                created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
        let page: Option<i64> = row.get(1)?;
        let chunk_index: i64 = row.get(2)?;
        let start_offset: Option<i64> = row.get(3)?;
        Ok(ChunkRecord {
            source: row.get(0)?,
            page: page.and_then(|p| u32::try_from(p).ok()),
            chunk_index: usize::try_from(chunk_index).unwrap_or_default(),
            start_offset: start_offset.and_then(|o| usize::try_from(o).ok()),
            text: row.get(4)?,
        })
    }

    /// Embed and index one chunk; chunks without indexable text are skipped
    fn index_chunk(&self, key: ChunkKey, text: &str) -> Result<bool, StoreError> {
        match self.embedder.embed(text) {
            Ok(embedding) => {
                self.index.add(key, &embedding)?;
                Ok(true)
            }
            Err(EmbeddingError::InvalidInput(reason)) => {
                debug!("Skipping chunk {} from vector index: {}", key, reason);
                Ok(false)
            }
        }
    }

    /// Reload every chunk from SQLite into a fresh vector index
    fn rebuild_index(&self) -> Result<usize, StoreError> {
        self.index.clear()?;

        let rows: Vec<(ChunkKey, String)> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare("SELECT id, text FROM chunks ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, ChunkKey>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<Result<_, _>>()?
        };

        let mut indexed = 0;
        for (key, text) in &rows {
            if self.index_chunk(*key, text)? {
                indexed += 1;
            }
        }

        info!("Rebuilt vector index with {} of {} chunks", indexed, rows.len());
        Ok(indexed)
    }

    /// Replace the whole corpus and start a new session
    ///
    /// Returns the id of the new session. Any extraction results tied to an
    /// earlier session are stale from this point on.
    pub fn replace_all(&self, chunks: &[ChunkRecord]) -> Result<SessionId, StoreError> {
        let session = SessionId::new();
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM chunks", [])?;
            let created_at = Self::now();
            for chunk in chunks {
                Self::insert_chunk(&tx, chunk, created_at)?;
            }
            tx.execute(
                "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![SESSION_KEY, session.to_string()],
            )?;
            tx.commit()?;
        }

        self.rebuild_index()?;
        info!("Replaced corpus with {} chunks (session {})", chunks.len(), session);
        Ok(session)
    }

    /// Append chunks without starting a new session
    pub fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize, StoreError> {
        let keys: Vec<ChunkKey> = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let created_at = Self::now();
            let keys = chunks
                .iter()
                .map(|chunk| Self::insert_chunk(&tx, chunk, created_at))
                .collect::<Result<Vec<_>, _>>()?;
            tx.commit()?;
            keys
        };

        let mut indexed = 0;
        for (key, chunk) in keys.iter().zip(chunks) {
            if self.index_chunk(*key, &chunk.text)? {
                indexed += 1;
            }
        }
        Ok(indexed)
    }

    /// Session created by the most recent `replace_all`
    pub fn session(&self) -> Result<Option<SessionId>, StoreError> {
        let value: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| SessionId::from_string(&v).map_err(StoreError::InvalidData))
            .transpose()
    }

    /// Number of chunks in the vector index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Summarize the stored corpus
    pub fn stats(&self) -> Result<IndexStats, StoreError> {
        let session = self.session()?.map(|s| s.to_string());
        let conn = self.conn()?;

        let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*), COUNT(DISTINCT page) FROM chunks
             GROUP BY source ORDER BY source",
        )?;
        let sources = stmt
            .query_map([], |row| {
                let chunks: i64 = row.get(1)?;
                let pages: i64 = row.get(2)?;
                Ok(SourceSummary {
                    source: row.get(0)?,
                    chunks: chunks as usize,
                    pages: pages as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IndexStats {
            total_chunks: total_chunks as usize,
            indexed_chunks: self.index.len(),
            session,
            sources,
        })
    }

    /// Return up to `k` chunks most similar to `query`, best first
    pub fn search_chunks(&self, query: &str, k: usize) -> Result<Vec<ChunkRecord>, StoreError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query)?;
        let hits = self.index.search(&embedding, k, self.ef_search)?;
        debug!("Query '{}' matched {} chunks", query, hits.len());

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, page, chunk_index, start_offset, text FROM chunks WHERE id = ?1",
        )?;

        let mut chunks = Vec::with_capacity(hits.len());
        for (key, _similarity) in hits {
            if let Some(chunk) = stmt.query_row(params![key], Self::row_to_chunk).optional()? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }
}

#[async_trait]
impl<E: EmbeddingModel> Retriever for DocumentIndex<E> {
    type Error = StoreError;

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ChunkRecord>, Self::Error> {
        self.search_chunks(query, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datasheet_chunks() -> Vec<ChunkRecord> {
        vec![
            ChunkRecord::new("Housing material: PA66-GF30, black", "housing.pdf", 0)
                .with_page(0)
                .with_start_offset(0),
            ChunkRecord::new("Operating temperature range -40 C to 125 C", "housing.pdf", 1)
                .with_page(1)
                .with_start_offset(0),
            ChunkRecord::new("Number of cavities: 12, two rows", "pinout.pdf", 0).with_page(0),
        ]
    }

    #[test]
    fn test_empty_index_search_returns_nothing() {
        let index = DocumentIndex::in_memory().unwrap();
        assert!(index.is_empty());
        assert!(index.search_chunks("anything", 3).unwrap().is_empty());
        assert_eq!(index.session().unwrap(), None);
    }

    #[test]
    fn test_replace_all_indexes_chunks() {
        let index = DocumentIndex::in_memory().unwrap();
        let session = index.replace_all(&datasheet_chunks()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.session().unwrap(), Some(session));
    }

    #[test]
    fn test_search_ranks_relevant_chunk_first() {
        let index = DocumentIndex::in_memory().unwrap();
        index.replace_all(&datasheet_chunks()).unwrap();

        let hits = index.search_chunks("housing material", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("PA66-GF30"));
        assert_eq!(hits[0].source, "housing.pdf");
        assert_eq!(hits[0].page, Some(0));
        assert_eq!(hits[0].start_offset, Some(0));
    }

    #[test]
    fn test_replace_all_discards_previous_corpus() {
        let index = DocumentIndex::in_memory().unwrap();
        let first = index.replace_all(&datasheet_chunks()).unwrap();
        let second = index
            .replace_all(&[ChunkRecord::new("Colour: natural", "other.pdf", 0)])
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(index.len(), 1);
        let hits = index.search_chunks("material", 5).unwrap();
        assert!(hits.iter().all(|c| c.source == "other.pdf"));
    }

    #[test]
    fn test_add_chunks_keeps_session() {
        let index = DocumentIndex::in_memory().unwrap();
        let session = index.replace_all(&datasheet_chunks()).unwrap();
        let added = index
            .add_chunks(&[ChunkRecord::new("Wire seal: single wire seal", "seal.pdf", 0)])
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(index.len(), 4);
        assert_eq!(index.session().unwrap(), Some(session));
    }

    #[test]
    fn test_unindexable_chunk_is_stored_but_skipped() {
        let index = DocumentIndex::in_memory().unwrap();
        index
            .replace_all(&[
                ChunkRecord::new("----", "a.pdf", 0),
                ChunkRecord::new("Gender: female", "a.pdf", 1),
            ])
            .unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.indexed_chunks, 1);
    }

    #[test]
    fn test_stats_by_source() {
        let index = DocumentIndex::in_memory().unwrap();
        index.replace_all(&datasheet_chunks()).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert!(stats.session.is_some());
        assert_eq!(
            stats.sources,
            vec![
                SourceSummary { source: "housing.pdf".into(), chunks: 2, pages: 2 },
                SourceSummary { source: "pinout.pdf".into(), chunks: 1, pages: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_retriever_trait() {
        let index = DocumentIndex::in_memory().unwrap();
        index.replace_all(&datasheet_chunks()).unwrap();

        let hits = Retriever::search(&index, "cavities rows", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "pinout.pdf");
    }
}
