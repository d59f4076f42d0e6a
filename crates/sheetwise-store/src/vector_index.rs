//! HNSW Vector Index for Semantic Search
//!
//! A wrapper around the HNSW algorithm for nearest-neighbor search over chunk
//! embeddings.
//!
//! # Architecture
//!
//! - In-memory only; SQLite is the source of truth
//! - Rebuilt from SQLite on startup and after every re-ingestion
//!
//! # HNSW Parameters
//!
//! - **M**: Number of bi-directional links per node (default: 16)
//! - **efConstruction**: Candidate list size during construction (default: 200)
//! - **efSearch**: Candidate list size during search, passed per query

use hnsw_rs::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 100_000;

/// Identifier of an indexed chunk (its SQLite row id)
pub type ChunkKey = i64;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// A lock was poisoned by a panicking thread
    #[error("Vector index lock poisoned")]
    LockPoisoned,
}

struct IndexState {
    hnsw: Hnsw<'static, f32, DistCosine>,
    id_map: HashMap<usize, ChunkKey>,
    next_id: usize,
}

impl IndexState {
    fn empty() -> Self {
        let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);
        Self {
            hnsw: Hnsw::<'static, f32, DistCosine>::new(
                DEFAULT_M,
                DEFAULT_MAX_ELEMENTS,
                nb_layer,
                DEFAULT_EF_CONSTRUCTION,
                DistCosine {},
            ),
            id_map: HashMap::new(),
            next_id: 0,
        }
    }
}

/// Nearest-neighbor index over `(chunk key, embedding)` pairs
///
/// # Examples
///
/// ```no_run
/// use sheetwise_store::vector_index::VectorIndex;
///
/// let index = VectorIndex::new(3);
/// index.add(7, &[1.0, 0.0, 0.0]).unwrap();
///
/// let results = index.search(&[1.0, 0.0, 0.0], 5, 64).unwrap();
/// assert_eq!(results[0].0, 7);
/// ```
pub struct VectorIndex {
    dimension: usize,
    state: Arc<Mutex<IndexState>>,
}

impl VectorIndex {
    /// Create a new vector index with the specified dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: Arc::new(Mutex::new(IndexState::empty())),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, IndexState>, VectorIndexError> {
        self.state.lock().map_err(|_| VectorIndexError::LockPoisoned)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Embedding dimension accepted by this index
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add a chunk embedding to the index
    pub fn add(&self, key: ChunkKey, embedding: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(embedding)?;

        let mut state = self.state()?;
        let internal_id = state.next_id;
        state.next_id += 1;
        state.id_map.insert(internal_id, key);
        state.hnsw.insert((embedding, internal_id));

        Ok(())
    }

    /// Search for the k nearest neighbors to the given embedding
    ///
    /// Returns `(key, similarity)` pairs sorted by similarity, descending.
    /// An empty index yields an empty result.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(ChunkKey, f32)>, VectorIndexError> {
        self.check_dimension(query)?;

        let state = self.state()?;
        if state.id_map.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let results = state
            .hnsw
            .search(query, k, ef_search.max(k))
            .into_iter()
            .filter_map(|neighbour| {
                state
                    .id_map
                    .get(&neighbour.d_id)
                    .map(|&key| (key, 1.0 - neighbour.distance))
            })
            .collect();

        Ok(results)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.state().map(|state| state.id_map.len()).unwrap_or(0)
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every vector
    pub fn clear(&self) -> Result<(), VectorIndexError> {
        *self.state()? = IndexState::empty();
        Ok(())
    }
}
