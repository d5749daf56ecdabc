//! In-memory vector index with cosine similarity search.
//!
//! Stores recipe embeddings and provides exhaustive top-k similarity search.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of vectors inserted between progress log lines during bulk load.
pub const BUILD_BATCH_SIZE: usize = 2000;

/// In-memory vector index for semantic search.
///
/// Stores embeddings keyed by recipe ID, supporting:
/// - Insert/get operations
/// - Cosine similarity top-k search with optional threshold filtering
pub struct VectorIndex {
    /// Recipe ID -> embedding
    entries: HashMap<u64, Vec<f32>>,
    /// Expected embedding dimensions
    dimensions: usize,
}

/// A single hit from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Recipe ID
    pub id: u64,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

impl VectorIndex {
    /// Create a new empty vector index with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimensions,
        }
    }

    /// Create an index with pre-allocated capacity.
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or update an entry in the index.
    ///
    /// Returns an error if the embedding has zero norm (cannot be normalized).
    pub fn insert(&mut self, id: u64, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        if Self::l2_norm(&embedding) < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.entries.insert(id, embedding);

        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<&[f32]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Search for the `limit` vectors most similar to `query`.
    ///
    /// Results are sorted by similarity score (highest first), equal scores
    /// by ascending id. With a `threshold`, lower-scoring entries are dropped.
    pub fn search(
        &self,
        query: &[f32],
        threshold: Option<f32>,
        limit: usize,
    ) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = Self::l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut results: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|(id, embedding)| Neighbor {
                id: *id,
                score: Self::cosine_similarity(query, embedding, query_norm),
            })
            .filter(|result| threshold.map_or(true, |t| result.score >= t))
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });

        results.truncate(limit);

        Ok(results)
    }

    /// Compute L2 norm of a vector.
    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Compute cosine similarity between two vectors.
    /// Assumes query_norm is precomputed for efficiency.
    fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
        let target_norm = Self::l2_norm(target);
        if target_norm < f32::EPSILON {
            return 0.0;
        }

        let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
        dot_product / (query_norm * target_norm)
    }

    /// Bulk load parallel id / embedding arrays into the index.
    ///
    /// Zero-norm rows are skipped with a warning; any other failure aborts.
    /// Returns the number of skipped rows.
    pub fn bulk_load(&mut self, ids: Vec<u64>, embeddings: Vec<Vec<f32>>) -> Result<usize, IndexError> {
        if ids.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                ids: ids.len(),
                embeddings: embeddings.len(),
            });
        }

        let total = ids.len();
        self.entries.reserve(total);

        let mut skipped = 0;
        for (n, (id, embedding)) in ids.into_iter().zip(embeddings).enumerate() {
            if n % BUILD_BATCH_SIZE == 0 {
                log::info!(
                    "adding batch {}: items {} to {}",
                    n / BUILD_BATCH_SIZE + 1,
                    n,
                    (n + BUILD_BATCH_SIZE).min(total)
                );
            }

            match self.insert(id, embedding) {
                Ok(()) => {}
                Err(IndexError::ZeroNormVector) => {
                    log::warn!("skipping recipe {id}: zero-norm embedding");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(skipped)
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,

    #[error("Got {ids} ids but {embeddings} embeddings")]
    LengthMismatch { ids: usize, embeddings: usize },
}
