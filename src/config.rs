use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::storage::{self, StorageManager};

const CONFIG_FILE: &str = "config.yaml";
const BASE_PATH_ENV: &str = "RECIPE_FINDER_BASE_PATH";

/// Default embedding model, the one the precomputed recipe embeddings were made with
const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Number of nearest neighbours fetched per query before pagination
const DEFAULT_TOP_K: usize = 100;
const DEFAULT_LIMIT: usize = 20;
const DEFAULT_MAX_LIMIT: usize = 100;
const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Recipe metadata table (CSV with a header row)
    #[serde(default = "default_recipes_path")]
    pub recipes_path: PathBuf,

    /// Recipe ids of the precomputed embeddings (.npy, 1-D)
    #[serde(default = "default_ids_path")]
    pub ids_path: PathBuf,

    /// Precomputed recipe embeddings (.npy, 2-D, one row per id)
    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: PathBuf,

    /// Persisted vector index, built from the arrays above when missing
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Model name for query embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Drop hits scoring below this cosine similarity
    #[serde(default)]
    pub min_score: Option<f32>,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recipes_path: default_recipes_path(),
            ids_path: default_ids_path(),
            embeddings_path: default_embeddings_path(),
            index_path: default_index_path(),
            model: default_model(),
            download_timeout_secs: default_download_timeout_secs(),
            top_k: default_top_k(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            min_score: None,
            bind: default_bind(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_recipes_path() -> PathBuf {
    PathBuf::from("data/recipes.csv")
}

fn default_ids_path() -> PathBuf {
    PathBuf::from("data/ids_embs.npy")
}

fn default_embeddings_path() -> PathBuf {
    PathBuf::from("data/metadata_embs.npy")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("vectors.bin")
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Directory holding config.yaml, the model cache and the default data paths.
pub fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(base_path) = std::env::var(BASE_PATH_ENV) {
        return Ok(PathBuf::from(base_path));
    }

    let home = homedir::my_home()
        .context("could not determine home directory")?
        .context("home directory path is empty")?;

    Ok(home.join(".local/share/recipe-finder"))
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.top_k == 0 {
            bail!("top_k must be greater than 0");
        }

        if self.max_limit == 0 {
            bail!("max_limit must be greater than 0");
        }

        if self.default_limit == 0 || self.default_limit > self.max_limit {
            bail!(
                "default_limit must be between 1 and max_limit ({}), got {}",
                self.max_limit,
                self.default_limit
            );
        }

        if let Some(min_score) = self.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                bail!("min_score must be between -1.0 and 1.0, got {min_score}");
            }
        }

        if self.download_timeout_secs == 0 {
            bail!("download_timeout_secs must be greater than 0");
        }

        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, writing the defaults first when
    /// the file does not exist yet.
    pub fn load_with(base_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base_path = base_path.as_ref();
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to create {}", base_path.display()))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("writing default config to {}", base_path.join(CONFIG_FILE).display());
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;

        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a configured path against the base directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}
