//! Plain-text views of search results and recipes for the terminal.

use std::fmt::Write;

use crate::models::{RecipeCard, RecipeDetail, SearchResponse, SearchResult};

const DESCRIPTION_PREVIEW_CHARS: usize = 150;
const MAX_TAGS: usize = 20;

/// Cut a description to 150 characters at the last word boundary.
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return description.to_string();
    }

    let head: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    let head = match head.rsplit_once(' ') {
        Some((before, _)) => before.to_string(),
        None => head,
    };

    format!("{head}...")
}

/// Calories rounded to two decimals, `-` when unknown.
pub fn format_calories(calories: Option<f64>) -> String {
    match calories {
        // Display drops the fraction of whole numbers: 800.0 -> "800"
        Some(v) if v.is_finite() => format!("{}", (v * 100.0).round() / 100.0),
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn write_header(
    out: &mut String,
    name: Option<&str>,
    category: Option<&str>,
    description: &str,
    keywords: &[String],
) {
    let _ = writeln!(out, "{}", name.unwrap_or("-"));
    if let Some(category) = category {
        let _ = writeln!(out, "  {category}");
    }
    if !description.is_empty() {
        let _ = writeln!(out, "  {description}");
    }
    if !keywords.is_empty() {
        let tags: Vec<String> = keywords.iter().take(MAX_TAGS).map(|t| format!("#{t}")).collect();
        let _ = writeln!(out, "  {}", tags.join(" "));
    }
}

fn write_stats(
    out: &mut String,
    n_ingredients: Option<u32>,
    total_time_minutes: Option<u32>,
    calories: Option<f64>,
    rating: Option<f64>,
) {
    let _ = writeln!(
        out,
        "  {} ingredients | {} min | {} kcal | {} rating",
        or_dash(n_ingredients),
        or_dash(total_time_minutes),
        format_calories(calories),
        or_dash(rating),
    );
}

pub fn render_card(card: &RecipeCard) -> String {
    let mut out = String::new();

    let description = card
        .description
        .as_deref()
        .map(truncate_description)
        .unwrap_or_default();

    write_header(
        &mut out,
        card.name.as_deref(),
        card.recipe_category.as_deref(),
        &description,
        &card.keywords,
    );
    write_stats(
        &mut out,
        card.n_ingredients,
        card.total_time_minutes,
        card.calories,
        card.aggregated_rating,
    );

    out
}

pub fn render_result(result: &SearchResult) -> String {
    let mut out = match &result.card {
        Some(card) => render_card(card),
        None => format!("Recipe {}\n", result.recipe_id),
    };

    let _ = writeln!(
        out,
        "  id {} | similarity {:.3}",
        result.recipe_id, result.similarity_score
    );

    out
}

/// One page of results followed by a hint for fetching the next page.
pub fn render_page(response: &SearchResponse) -> String {
    if response.search_results.is_empty() {
        return if response.total_count == 0 {
            "No recipes found.\n".to_string()
        } else {
            format!(
                "No results at offset {} ({} in total).\n",
                response.offset, response.total_count
            )
        };
    }

    let mut out = String::new();
    for result in &response.search_results {
        out.push_str(&render_result(result));
        out.push('\n');
    }

    let first = response.offset + 1;
    let last = response.offset + response.search_results.len();
    let _ = writeln!(out, "Showing {first}-{last} of {}", response.total_count);

    if let Some(next) = next_offset(response) {
        let _ = writeln!(out, "Load more: --offset {next} --limit {}", response.limit);
    }

    out
}

/// Offset of the next page, if there is one. A short page means the end was
/// reached.
pub fn next_offset(response: &SearchResponse) -> Option<usize> {
    let shown = response.search_results.len();
    let next = response.offset + shown;

    (shown >= response.limit && next < response.total_count).then_some(next)
}

fn nutrient_line(label: &str, percent: Option<f64>, grams: Option<f64>) -> String {
    let percent = percent.unwrap_or(0.0).clamp(0.0, 100.0);
    let grams = match grams {
        Some(g) => format!("{g:.2} g"),
        None => "-".to_string(),
    };

    format!("  {label:<8} {percent:>6.2}%  {grams}")
}

pub fn render_detail(recipe: &RecipeDetail) -> String {
    let mut out = String::new();

    write_header(
        &mut out,
        recipe.name.as_deref(),
        recipe.recipe_category.as_deref(),
        recipe.description.as_deref().unwrap_or_default(),
        &recipe.keywords,
    );
    write_stats(
        &mut out,
        recipe.n_ingredients,
        recipe.total_time_minutes,
        recipe.calories,
        recipe.aggregated_rating,
    );

    let _ = writeln!(out, "\nIngredients");
    if recipe.ingredients.is_empty() {
        let _ = writeln!(out, "  No ingredients listed.");
    }
    for ingredient in &recipe.ingredients {
        let _ = writeln!(out, "  - {ingredient}");
    }

    let _ = writeln!(out, "\nInstructions");
    if recipe.recipe_instructions.is_empty() {
        let _ = writeln!(out, "  No instructions available.");
    }
    for (n, step) in recipe.recipe_instructions.iter().enumerate() {
        let _ = writeln!(out, "  {}. {step}", n + 1);
    }

    let _ = writeln!(out, "\nNutrition (%)");
    let nutrients = [
        ("Fat", recipe.fat_content_perc, recipe.fat_content),
        ("Protein", recipe.protein_content_perc, recipe.protein_content),
        ("Sugar", recipe.sugar_content_perc, recipe.sugar_content),
        ("Carb", recipe.carbohydrate_content_perc, recipe.carbohydrate_content),
    ];
    for (label, percent, grams) in nutrients {
        let _ = writeln!(out, "{}", nutrient_line(label, percent, grams));
    }

    out
}
