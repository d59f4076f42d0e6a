//! Embedding Model for Text Vectorization
//!
//! Text-to-vector conversion for chunk retrieval. Embeddings are computed
//! locally so indexing needs no network access or model files.
//!
//! # Hashing Model
//!
//! `HashingEmbeddingModel` maps lowercase word tokens and adjacent word pairs
//! into a fixed number of buckets (the "hashing trick") and L2-normalizes the
//! counts. Chunks that share vocabulary with a query land close to it under
//! cosine distance, which is enough to rank datasheet passages such as
//! "Material: PA66-GF30" for a query about "Material Filling".
//!
//! # Examples
//!
//! ```rust
//! use sheetwise_store::embedding::{HashingEmbeddingModel, EmbeddingModel};
//!
//! let model = HashingEmbeddingModel::new(384);
//! let embedding = model.embed("Housing material PA66").unwrap();
//! assert_eq!(embedding.len(), 384);
//! assert_eq!(embedding, model.embed("Housing material PA66").unwrap());
//! ```

use thiserror::Error;

/// Default embedding dimension, matching all-MiniLM-L6-v2
pub const DEFAULT_DIMENSION: usize = 384;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words embedding using feature hashing
#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    dimension: usize,
}

impl HashingEmbeddingModel {
    /// Create a new hashing model with the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// FNV-1a, stable across platforms and compiler versions
    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in bytes {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn accumulate(&self, feature: &str, weight: f32, embedding: &mut [f32]) {
        let hash = Self::fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        // The top bit picks a sign so collisions tend to cancel out
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl EmbeddingModel for HashingEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = Self::tokens(text);
        if tokens.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Text has no indexable tokens".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        for token in &tokens {
            self.accumulate(token, 1.0, &mut embedding);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&format!("{} {}", pair[0], pair[1]), 0.5, &mut embedding);
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude == 0.0 {
            // Every feature cancelled out; fall back to an unsigned bucket
            let bucket = (Self::fnv1a(text.as_bytes()) % self.dimension as u64) as usize;
            embedding[bucket] = 1.0;
            return Ok(embedding);
        }
        for value in &mut embedding {
            *value /= magnitude;
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Calculate cosine similarity between two embedding vectors
///
/// Returns 0.0 when the lengths differ or either vector is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_deterministic() {
        let model = HashingEmbeddingModel::default();
        let text = "Connector housing PA66 GF30 black";
        assert_eq!(model.embed(text).unwrap(), model.embed(text).unwrap());
    }

    #[test]
    fn test_embedding_dimension() {
        let model = HashingEmbeddingModel::new(128);
        assert_eq!(model.embed("test").unwrap().len(), 128);
        assert_eq!(model.dimension(), 128);
    }

    #[test]
    fn test_embedding_normalized() {
        let model = HashingEmbeddingModel::default();
        let embedding = model.embed("sealing class IP67").unwrap();
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_embedding_is_case_insensitive() {
        let model = HashingEmbeddingModel::default();
        assert_eq!(
            model.embed("Material PA66").unwrap(),
            model.embed("material pa66").unwrap()
        );
    }

    #[test]
    fn test_empty_text_rejected() {
        let model = HashingEmbeddingModel::default();
        assert!(model.embed("").is_err());
        assert!(model.embed("--- ,,, ---").is_err());
    }

    #[test]
    fn test_shared_vocabulary_ranks_higher() {
        let model = HashingEmbeddingModel::default();
        let query = model.embed("housing material").unwrap();
        let related = model.embed("Housing material: PA66-GF30").unwrap();
        let unrelated = model.embed("Operating temperature -40 to 125 C").unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let vec = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&vec, &vec) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
