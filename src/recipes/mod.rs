//! Tabular recipe metadata.
//!
//! - `store`: read-only recipe table keyed by recipe id, loaded from CSV
//!   or Parquet
//! - `columnar`: Parquet reader producing the same rows as the CSV reader
//! - `normalize`: parsing of list-valued columns

mod columnar;
mod normalize;
mod store;

pub use normalize::{parse_instructions, parse_keywords, parse_list};
pub use store::RecipeStore;

use crate::models::{RecipeCard, RecipeDetail};

impl From<&RecipeDetail> for RecipeCard {
    fn from(recipe: &RecipeDetail) -> Self {
        RecipeCard {
            recipe_id: recipe.recipe_id,
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            recipe_category: recipe.recipe_category.clone(),
            keywords: recipe.keywords.clone(),
            n_ingredients: recipe.n_ingredients,
            total_time_minutes: recipe.total_time_minutes,
            calories: recipe.calories,
            aggregated_rating: recipe.aggregated_rating,
        }
    }
}
