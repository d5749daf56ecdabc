//! Recipe search pipeline.
//!
//! query -> clean_text -> embedder -> vector index -> recipe store join
//!
//! The service is built once at start-up and only read afterwards, so it can
//! be shared between request handlers behind an `Arc`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{RecipeCard, SearchResult};
use crate::recipes::RecipeStore;
use crate::semantic::embeddings::{model_id_hash, vectorize_text, EmbeddingError, TextEmbedder};
use crate::semantic::index::{IndexError, VectorIndex};
use crate::semantic::npy::{self, NpyError};
use crate::semantic::preprocess::clean_text;
use crate::semantic::storage::{VectorStorage, VectorStorageError};
use crate::semantic::EmbeddingModel;

/// Errors that can occur during semantic search operations.
#[derive(Debug, thiserror::Error)]
pub enum SemanticSearchError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] VectorStorageError),

    #[error("Precomputed arrays: {0}")]
    Npy(#[from] NpyError),

    #[error("Embedding matrix has no rows")]
    NoEmbeddings,

    #[error("Model '{model}' produces {model_dims}-dimensional vectors, index has {index_dims}")]
    DimensionMismatch {
        model: String,
        model_dims: usize,
        index_dims: usize,
    },
}

/// Semantic search over the recipe index.
pub struct SearchService {
    embedder: Box<dyn TextEmbedder>,
    index: VectorIndex,
    recipes: Arc<RecipeStore>,
    min_score: Option<f32>,
}

impl SearchService {
    /// Assemble a service from its parts.
    ///
    /// Fails when the embedder and the index disagree on dimensions.
    pub fn new(
        embedder: Box<dyn TextEmbedder>,
        index: VectorIndex,
        recipes: Arc<RecipeStore>,
    ) -> Result<Self, SemanticSearchError> {
        if embedder.dimensions() != index.dimensions() {
            return Err(SemanticSearchError::DimensionMismatch {
                model: embedder.name().to_string(),
                model_dims: embedder.dimensions(),
                index_dims: index.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            index,
            recipes,
            min_score: None,
        })
    }

    /// Drop hits scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Load the embedding model and the vector index described by `config`.
    pub fn load(config: &Config, recipes: Arc<RecipeStore>) -> Result<Self, SemanticSearchError> {
        log::info!("initializing semantic search with model '{}'", config.model);

        let timeout = Duration::from_secs(config.download_timeout_secs);
        let model = EmbeddingModel::new(&config.model, config.base_path().to_path_buf(), Some(timeout))?;

        let index = load_or_build_index(config, &model)?;

        Ok(Self::new(Box::new(model), index, recipes)?.with_min_score(config.min_score))
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    /// Return ids and similarity scores of the `top_k` recipes closest to
    /// `query`, best first.
    ///
    /// Blank queries return no hits without touching the model. Anything
    /// else is embedded after cleaning, even when cleaning leaves nothing.
    pub fn search(&self, query: &str, top_k: usize) -> Result<(Vec<u64>, Vec<f32>), SemanticSearchError> {
        if query.trim().is_empty() {
            return Ok((vec![], vec![]));
        }

        let cleaned = clean_text(query);
        if cleaned.is_empty() {
            log::debug!("query {query:?} is empty after cleaning");
        }

        let now = Instant::now();
        let vector = vectorize_text(&cleaned, self.embedder.as_ref(), true)?;

        let neighbors = match self.index.search(&vector, self.min_score, top_k) {
            Ok(neighbors) => neighbors,
            Err(IndexError::ZeroNormVector) => {
                log::warn!("query {cleaned:?} embedded to a zero vector");
                return Ok((vec![], vec![]));
            }
            Err(err) => return Err(err.into()),
        };

        log::debug!(
            "query {cleaned:?}: {} hits in {}ms",
            neighbors.len(),
            now.elapsed().as_micros() as f64 / 1000.0
        );

        Ok(neighbors.into_iter().map(|n| (n.id, n.score)).unzip())
    }

    /// One card per id, in order. Ids without a metadata row get a minimal
    /// card; an empty store yields no cards at all.
    pub fn recipe_cards(&self, ids: &[u64]) -> Vec<RecipeCard> {
        if self.recipes.is_empty() {
            return vec![];
        }

        ids.iter()
            .map(|id| {
                self.recipes.card(*id).unwrap_or_else(|| {
                    log::debug!("recipe {id} has no metadata row");
                    RecipeCard::minimal(*id)
                })
            })
            .collect()
    }

    /// Search and join the hits with their recipe cards.
    pub fn search_results(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, SemanticSearchError> {
        let (ids, scores) = self.search(query, top_k)?;
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut cards = self.recipe_cards(&ids).into_iter();

        Ok(ids
            .into_iter()
            .zip(scores)
            .map(|(recipe_id, similarity_score)| SearchResult {
                recipe_id,
                similarity_score,
                card: cards.next(),
            })
            .collect())
    }
}

/// Load the persisted index, rebuilding it from the precomputed arrays when
/// it is missing or was written for another model or format version.
pub fn load_or_build_index(
    config: &Config,
    embedder: &dyn TextEmbedder,
) -> Result<VectorIndex, SemanticSearchError> {
    let storage = VectorStorage::new(config.resolve(&config.index_path));
    let model_id = embedder.model_id_hash();

    if storage.exists() {
        match storage.load(&model_id, embedder.dimensions()) {
            Ok(index) => {
                log::info!("loaded {} vectors from {}", index.len(), storage.path().display());
                return Ok(index);
            }
            Err(VectorStorageError::ModelMismatch) => {
                log::warn!("index was built for a different model, rebuilding");
            }
            Err(VectorStorageError::VersionMismatch(file_ver, _)) => {
                log::warn!("index format version {file_ver} unsupported, rebuilding");
            }
            Err(VectorStorageError::DimensionMismatch { expected, got }) => {
                log::warn!("index has {got} dimensions, model produces {expected}, rebuilding");
            }
            Err(e) => {
                log::error!("failed to load vectors: {e}");
                return Err(e.into());
            }
        }
    } else {
        log::info!("no index at {}, building it", storage.path().display());
    }

    build_index(config, &model_id)
}

/// Build the vector index from the `.npy` id array and embedding matrix and
/// persist it tagged with `model_id`.
pub fn build_index(config: &Config, model_id: &[u8; 32]) -> Result<VectorIndex, SemanticSearchError> {
    let now = Instant::now();

    let ids_path = config.resolve(&config.ids_path);
    let embeddings_path = config.resolve(&config.embeddings_path);

    let ids = npy::read_ids(&ids_path)?;
    let embeddings = npy::read_embeddings(&embeddings_path)?;
    log::info!(
        "read {} ids from {} and {} embeddings from {}",
        ids.len(),
        ids_path.display(),
        embeddings.len(),
        embeddings_path.display()
    );

    let dimensions = embeddings
        .first()
        .map(Vec::len)
        .ok_or(SemanticSearchError::NoEmbeddings)?;

    let mut index = VectorIndex::with_capacity(dimensions, ids.len());
    let skipped = index.bulk_load(ids, embeddings)?;
    if skipped > 0 {
        log::warn!("{skipped} zero-norm embeddings were left out of the index");
    }

    let storage = VectorStorage::new(config.resolve(&config.index_path));
    storage.save(&index, model_id)?;

    log::info!(
        "indexed {} recipes into {} in {}ms",
        index.len(),
        storage.path().display(),
        now.elapsed().as_millis()
    );

    Ok(index)
}

/// Build the index for the configured model without loading the model.
pub fn build_index_for(config: &Config) -> Result<VectorIndex, SemanticSearchError> {
    build_index(config, &model_id_hash(&config.model))
}
