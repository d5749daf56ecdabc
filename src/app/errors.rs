use crate::semantic::SemanticSearchError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("search is not ready, resources are still loading or failed to load")]
    NotReady,

    #[error("recipe {0} not found")]
    RecipeNotFound(u64),

    #[error("recipe store is unavailable")]
    StoreUnavailable,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("search failed: {0}")]
    Search(#[from] SemanticSearchError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
