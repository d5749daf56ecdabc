use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use serde::Deserialize;

use super::columnar;
use super::normalize::{parse_instructions, parse_keywords, parse_list};
use crate::models::{RecipeCard, RecipeDetail};

/// Read-only recipe table keyed by recipe id.
#[derive(Debug, Default)]
pub struct RecipeStore {
    recipes: HashMap<u64, RecipeDetail>,
}

/// One row of the recipe table as exported by the data pipeline.
///
/// Columns are matched by name; missing columns and unparsable numbers
/// become `None`. List columns hold their raw text, or a JSON array when
/// the file stores real lists.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RecipeRow {
    pub recipe_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub recipe_category: Option<String>,
    pub keywords: Option<String>,
    pub ingredients: Option<String>,
    pub recipe_instructions: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub n_ingredients: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub total_time_minutes: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub calories: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub aggregated_rating: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub carbohydrate_content: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub fat_content: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub protein_content: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub sugar_content: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub carbohydrate_content_perc: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub fat_content_perc: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub protein_content_perc: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub sugar_content_perc: Option<f64>,
}

impl RecipeRow {
    fn into_detail(self, recipe_id: u64) -> RecipeDetail {
        let ingredients = self.ingredients.as_deref().map(parse_list).unwrap_or_default();
        let n_ingredients = self.n_ingredients.and_then(whole_number).or_else(|| {
            if ingredients.is_empty() {
                None
            } else {
                u32::try_from(ingredients.len()).ok()
            }
        });

        RecipeDetail {
            recipe_id,
            name: non_empty(self.name),
            description: non_empty(self.description),
            recipe_category: non_empty(self.recipe_category),
            keywords: self.keywords.as_deref().map(parse_keywords).unwrap_or_default(),
            recipe_instructions: self
                .recipe_instructions
                .as_deref()
                .map(parse_instructions)
                .unwrap_or_default(),
            ingredients,
            n_ingredients,
            total_time_minutes: self.total_time_minutes.and_then(whole_number),
            calories: self.calories,
            aggregated_rating: self.aggregated_rating,
            carbohydrate_content: self.carbohydrate_content,
            fat_content: self.fat_content,
            protein_content: self.protein_content,
            sugar_content: self.sugar_content,
            carbohydrate_content_perc: self.carbohydrate_content_perc,
            fat_content_perc: self.fat_content_perc,
            protein_content_perc: self.protein_content_perc,
            sugar_content_perc: self.sugar_content_perc,
        }
    }
}

impl RecipeStore {
    /// Load the recipe table. `.parquet` files are read as Parquet,
    /// anything else as CSV with a header row.
    ///
    /// Rows without a usable `recipe_id` are skipped. When an id appears
    /// more than once the first row wins.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let now = Instant::now();

        let is_parquet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

        let rows = if is_parquet {
            columnar::read_rows(path)?
        } else {
            read_csv_rows(path)?
        };

        let mut recipes = Vec::with_capacity(rows.len());
        for (n, row) in rows.into_iter().enumerate() {
            let Some(recipe_id) = row.recipe_id.as_deref().and_then(parse_id) else {
                log::warn!("skipping row {}: missing or invalid recipe_id", n + 1);
                continue;
            };

            recipes.push(row.into_detail(recipe_id));
        }

        let store = Self::from_recipes(recipes);

        log::debug!(
            "took {}ms to read recipes table",
            now.elapsed().as_micros() as f64 / 1000.0
        );
        log::info!("loaded {} recipes from {}", store.len(), path.display());

        Ok(store)
    }

    /// Build a store from already parsed recipes. The first recipe with a
    /// given id wins.
    pub fn from_recipes(recipes: impl IntoIterator<Item = RecipeDetail>) -> Self {
        let mut map = HashMap::new();
        for recipe in recipes {
            if map.contains_key(&recipe.recipe_id) {
                log::warn!("duplicate recipe id {}, keeping the first row", recipe.recipe_id);
                continue;
            }
            map.insert(recipe.recipe_id, recipe);
        }

        Self { recipes: map }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.recipes.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&RecipeDetail> {
        self.recipes.get(&id)
    }

    pub fn card(&self, id: u64) -> Option<RecipeCard> {
        self.get(id).map(RecipeCard::from)
    }

    pub fn detail(&self, id: u64) -> Option<RecipeDetail> {
        self.get(id).cloned()
    }
}

fn read_csv_rows(path: &Path) -> anyhow::Result<Vec<RecipeRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open recipes table {}", path.display()))?;

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == "recipe_id") {
        anyhow::bail!("recipes table {} has no recipe_id column", path.display());
    }

    reader
        .deserialize::<RecipeRow>()
        .enumerate()
        .map(|(line, row)| row.with_context(|| format!("malformed row {} in {}", line + 2, path.display())))
        .collect()
}

/// Parse an id cell; integral floats ("38.0") are accepted.
fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    })
}

fn whole_number(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value.round() as u32)
    } else {
        None
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
