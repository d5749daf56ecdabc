use std::sync::Arc;

use crate::{
    config::Config,
    models::{RecipeDetail, SearchResponse, SearchResult},
    recipes::RecipeStore,
    semantic::SearchService,
};

use super::AppError;

/// Resources shared by the HTTP handlers and the in-process CLI.
///
/// Either resource may be missing when it failed to load; the process keeps
/// running and the affected operations report an error instead.
#[derive(Clone)]
pub struct AppState {
    pub search: Option<Arc<SearchService>>,
    pub recipes: Option<Arc<RecipeStore>>,
    pub top_k: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl AppState {
    pub fn new(search: Option<Arc<SearchService>>, recipes: Option<Arc<RecipeStore>>) -> Self {
        let defaults = Config::default();

        Self {
            search,
            recipes,
            top_k: defaults.top_k,
            default_limit: defaults.default_limit,
            max_limit: defaults.max_limit,
        }
    }

    /// Load the recipe table and the search service. Failures are logged
    /// and leave the resource empty.
    pub fn load(config: &Config) -> Self {
        let recipes_path = config.resolve(&config.recipes_path);
        let recipes = match RecipeStore::load(&recipes_path) {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                log::error!("failed to load recipes from {}: {err:#}", recipes_path.display());
                None
            }
        };

        let search = match SearchService::load(config, recipes.clone().unwrap_or_default()) {
            Ok(service) => {
                log::info!("search ready with {} indexed recipes", service.indexed_count());
                Some(Arc::new(service))
            }
            Err(err) => {
                log::error!("failed to initialize search: {err}");
                None
            }
        };

        Self {
            search,
            recipes,
            top_k: config.top_k,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.search.is_some() && self.recipes.is_some()
    }

    /// Run a search and return one page of the results.
    pub fn search(&self, query: &str, offset: usize, limit: usize) -> Result<SearchResponse, AppError> {
        if !(1..=self.max_limit).contains(&limit) {
            return Err(AppError::InvalidRequest(format!(
                "limit must be between 1 and {}, got {limit}",
                self.max_limit
            )));
        }

        let search = match (&self.search, &self.recipes) {
            (Some(search), Some(_)) => search,
            _ => {
                log::warn!(
                    "search resources not initialized (search={}, recipes={})",
                    self.search.is_some(),
                    self.recipes.is_some()
                );
                return Err(AppError::NotReady);
            }
        };

        log::info!("search request: query={query:?} offset={offset} limit={limit}");

        let results = search.search_results(query, self.top_k)?;
        let response = paginate(results, offset, limit);

        log::info!(
            "returning {} results (offset={offset}, limit={limit}, total={})",
            response.search_results.len(),
            response.total_count
        );

        Ok(response)
    }

    /// Full view of a single recipe.
    pub fn recipe(&self, id: u64) -> Result<RecipeDetail, AppError> {
        let recipes = self.recipes.as_ref().ok_or_else(|| {
            log::error!("recipe store not loaded");
            AppError::StoreUnavailable
        })?;

        recipes.detail(id).ok_or_else(|| {
            log::debug!("recipe id={id} not found");
            AppError::RecipeNotFound(id)
        })
    }
}

/// Cut `[offset, offset + limit)` out of `results`. `total_count` is the
/// length before slicing.
pub fn paginate(results: Vec<SearchResult>, offset: usize, limit: usize) -> SearchResponse {
    let total_count = results.len();

    let search_results = results.into_iter().skip(offset).take(limit).collect();

    SearchResponse {
        search_results,
        total_count,
        offset,
        limit,
    }
}
