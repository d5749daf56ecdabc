//! Semantic search over recipe embeddings.
//!
//! Query embeddings come from fastembed-rs; recipe embeddings are
//! precomputed and searched with an in-memory cosine index.
//!
//! # Architecture
//!
//! - `preprocess`: Query cleaning before embedding
//! - `embeddings`: Wraps fastembed for embedding generation
//! - `index`: In-memory vector index with cosine similarity search
//! - `npy`: Reader for the precomputed NumPy id and embedding arrays
//! - `storage`: Binary file I/O for vectors.bin persistence
//! - `service`: The search pipeline tying the above to the recipe store

pub mod embeddings;
mod index;
pub mod npy;
mod preprocess;
mod service;
mod storage;

pub use embeddings::{EmbeddingModel, TextEmbedder};
pub use index::VectorIndex;
pub use preprocess::clean_text;
pub use service::{build_index_for, SearchService, SemanticSearchError};
