//! End-to-end search over files on disk: CSV recipe table, `.npy` arrays,
//! persisted index.

use std::path::Path;
use std::sync::Arc;

use super::support::{KeywordEmbedder, CORPUS, VOCABULARY};
use crate::app::AppState;
use crate::config::Config;
use crate::recipes::RecipeStore;
use crate::semantic::npy::write;
use crate::semantic::{build_index_for, SearchService};

fn write_fixtures(dir: &Path, embedder: &KeywordEmbedder) {
    std::fs::create_dir_all(dir.join("data")).unwrap();

    let mut csv = String::from("recipe_id,name,keywords,ingredients,calories\n");
    for (id, name, text) in CORPUS {
        csv.push_str(&format!(
            "{id},{name},\"{}\",\"['salt', 'pepper']\",{}\n",
            text.replace(' ', "|"),
            100 * id
        ));
    }
    // a row whose embedding is missing from the arrays
    csv.push_str("99,Lonely Bread,bread,flour,50\n");
    std::fs::write(dir.join("data/recipes.csv"), csv).unwrap();

    // float ids, as they come out of pandas
    let ids: Vec<f64> = CORPUS.iter().map(|(id, _, _)| *id as f64).collect();
    let rows: Vec<Vec<f32>> = CORPUS.iter().map(|(_, _, text)| embedder.vector(text)).collect();
    write::ids_f64(&dir.join("data/ids_embs.npy"), &ids);
    write::matrix_f32(&dir.join("data/metadata_embs.npy"), &rows);
}

fn load_state(dir: &Path) -> AppState {
    let embedder = KeywordEmbedder::new(VOCABULARY);
    write_fixtures(dir, &embedder);

    let config = Config::load_with(dir).unwrap();
    let index = build_index_for(&config).unwrap();
    let recipes = Arc::new(RecipeStore::load(&config.resolve(&config.recipes_path)).unwrap());

    let search = SearchService::new(Box::new(embedder), index, recipes.clone()).unwrap();

    AppState::new(Some(Arc::new(search)), Some(recipes))
}

// --- search ---

#[test]
fn search_ranks_and_joins_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let state = load_state(dir.path());

    let response = state.search("Chicken & Pizza!!", 0, 20).unwrap();

    let ids: Vec<u64> = response.search_results.iter().map(|r| r.recipe_id).collect();
    assert_eq!(ids, vec![1, 2, 6, 4, 3, 5]);
    assert_eq!(response.total_count, 6);

    let top = &response.search_results[0];
    assert!((top.similarity_score - 1.0).abs() < 1e-5);

    let card = top.card.as_ref().unwrap();
    assert_eq!(card.name.as_deref(), Some("Chicken Pizza"));
    assert_eq!(card.keywords, vec!["chicken", "pizza"]);
    assert_eq!(card.n_ingredients, Some(2));
    assert_eq!(card.calories, Some(100.0));
}

#[test]
fn scores_are_non_increasing() {
    let dir = tempfile::tempdir().unwrap();
    let state = load_state(dir.path());

    let response = state.search("vegan chocolate", 0, 100).unwrap();
    let scores: Vec<f32> = response
        .search_results
        .iter()
        .map(|r| r.similarity_score)
        .collect();

    assert_eq!(response.search_results[0].recipe_id, 5);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn pages_cover_all_results_once() {
    let dir = tempfile::tempdir().unwrap();
    let state = load_state(dir.path());

    let mut seen = vec![];
    let mut offset = 0;
    loop {
        let page = state.search("chicken", offset, 4).unwrap();
        assert_eq!(page.total_count, 6);

        seen.extend(page.search_results.iter().map(|r| r.recipe_id));
        if page.search_results.len() < 4 {
            break;
        }
        offset += 4;
    }

    let full: Vec<u64> = state
        .search("chicken", 0, 100)
        .unwrap()
        .search_results
        .iter()
        .map(|r| r.recipe_id)
        .collect();
    assert_eq!(seen, full);
}

#[test]
fn blank_and_unknown_queries_return_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state = load_state(dir.path());

    // "42 !!" cleans to "" and is embedded like "lasagna": no known words,
    // so the keyword embedder yields a zero vector
    for query in ["", "   ", "42 !!", "lasagna"] {
        let response = state.search(query, 0, 20).unwrap();
        assert_eq!(response.total_count, 0, "query {query:?}");
        assert!(response.search_results.is_empty());
    }
}

// --- details ---

#[test]
fn detail_for_row_without_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let state = load_state(dir.path());

    let detail = state.recipe(99).unwrap();
    assert_eq!(detail.name.as_deref(), Some("Lonely Bread"));
    assert_eq!(detail.ingredients, vec!["flour"]);
    assert_eq!(detail.n_ingredients, Some(1));
}

// --- persisted index ---

#[test]
fn build_index_writes_vectors_file() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = KeywordEmbedder::new(VOCABULARY);
    write_fixtures(dir.path(), &embedder);

    let config = Config::load_with(dir.path()).unwrap();
    let index = build_index_for(&config).unwrap();

    assert_eq!(index.len(), CORPUS.len());
    assert_eq!(index.dimensions(), VOCABULARY.len());
    assert!(dir.path().join("vectors.bin").exists());
}
