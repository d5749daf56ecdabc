//! Shared fixtures: a deterministic embedder and a small recipe corpus.

use std::sync::Arc;

use crate::app::AppState;
use crate::models::RecipeDetail;
use crate::recipes::RecipeStore;
use crate::semantic::embeddings::{EmbeddingError, TextEmbedder};
use crate::semantic::{SearchService, VectorIndex};

/// Bag-of-words embedder over a fixed vocabulary. Each dimension counts one
/// vocabulary word; text without known words embeds to a zero vector.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(words: &[&str]) -> Self {
        Self {
            vocabulary: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Embedding of `text`, for seeding an index in tests.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for word in text.split_whitespace() {
            if let Some(pos) = self.vocabulary.iter().position(|v| v == word) {
                vector[pos] += 1.0;
            }
        }
        vector
    }
}

impl TextEmbedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector(text))
    }
}

pub const VOCABULARY: &[&str] = &[
    "chicken", "pizza", "salad", "soup", "chocolate", "cake", "vegan", "spicy",
];

/// (id, name, indexed text)
pub const CORPUS: &[(u64, &str, &str)] = &[
    (1, "Chicken Pizza", "chicken pizza"),
    (2, "Chicken Salad", "chicken salad"),
    (3, "Chocolate Cake", "chocolate cake"),
    (4, "Spicy Chicken Soup", "spicy chicken soup"),
    (5, "Vegan Chocolate Cake", "vegan chocolate cake"),
    (6, "Veggie Pizza", "vegan pizza"),
];

pub fn corpus_recipes() -> Vec<RecipeDetail> {
    CORPUS
        .iter()
        .map(|(id, name, text)| RecipeDetail {
            recipe_id: *id,
            name: Some(name.to_string()),
            description: Some(format!("A recipe for {text}.")),
            keywords: text.split_whitespace().map(str::to_string).collect(),
            ingredients: vec!["salt".to_string()],
            recipe_instructions: vec!["Cook it.".to_string()],
            n_ingredients: Some(1),
            total_time_minutes: Some(30),
            calories: Some(250.5),
            aggregated_rating: Some(4.5),
            ..Default::default()
        })
        .collect()
}

pub fn corpus_index(embedder: &KeywordEmbedder) -> VectorIndex {
    let mut index = VectorIndex::new(embedder.dimensions());
    for (id, _, text) in CORPUS {
        index.insert(*id, embedder.vector(text)).unwrap();
    }
    index
}

/// Search service over the corpus, with or without metadata rows.
pub fn corpus_service(recipes: Arc<RecipeStore>) -> SearchService {
    let embedder = KeywordEmbedder::new(VOCABULARY);
    let index = corpus_index(&embedder);

    SearchService::new(Box::new(embedder), index, recipes).unwrap()
}

/// Fully loaded application state over the corpus.
pub fn ready_state() -> AppState {
    let recipes = Arc::new(RecipeStore::from_recipes(corpus_recipes()));
    let search = corpus_service(recipes.clone());

    AppState::new(Some(Arc::new(search)), Some(recipes))
}
