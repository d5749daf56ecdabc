//! Request and response shapes shared by the HTTP API, the remote client
//! and the terminal renderer.

use serde::{Deserialize, Serialize};

/// Abbreviated recipe view used in search result lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeCard {
    pub recipe_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipe_category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub n_ingredients: Option<u32>,
    #[serde(default)]
    pub total_time_minutes: Option<u32>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub aggregated_rating: Option<f64>,
}

impl RecipeCard {
    /// A card that only carries the id, for hits without a metadata row.
    pub fn minimal(recipe_id: u64) -> Self {
        Self {
            recipe_id,
            ..Default::default()
        }
    }
}

/// Full recipe view returned by `GET /recipe/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub recipe_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipe_category: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub recipe_instructions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub n_ingredients: Option<u32>,
    #[serde(default)]
    pub total_time_minutes: Option<u32>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub aggregated_rating: Option<f64>,
    #[serde(default)]
    pub carbohydrate_content: Option<f64>,
    #[serde(default)]
    pub fat_content: Option<f64>,
    #[serde(default)]
    pub protein_content: Option<f64>,
    #[serde(default)]
    pub sugar_content: Option<f64>,
    #[serde(default)]
    pub carbohydrate_content_perc: Option<f64>,
    #[serde(default)]
    pub fat_content_perc: Option<f64>,
    #[serde(default)]
    pub protein_content_perc: Option<f64>,
    #[serde(default)]
    pub sugar_content_perc: Option<f64>,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub recipe_id: u64,
    /// Cosine similarity between the query and the recipe embedding, in
    /// `[-1, 1]`. Higher is closer; results are sorted by it, descending.
    /// This is not a distance.
    pub similarity_score: f32,
    #[serde(default)]
    pub card: Option<RecipeCard>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub search_results: Vec<SearchResult>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
