use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{codes, AppError};

pub const ENV_DOCS_DIR: &str = "SWAT_DOCS_DIR";
pub const ENV_INDEX_DIR: &str = "SWAT_INDEX_DIR";
pub const ENV_OLLAMA_URL: &str = "SWAT_OLLAMA_URL";
pub const ENV_EMBED_MODEL: &str = "SWAT_EMBED_MODEL";
pub const ENV_CHUNK_SIZE: &str = "SWAT_CHUNK_SIZE";
pub const ENV_CHUNK_OVERLAP: &str = "SWAT_CHUNK_OVERLAP";

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
/// Ollama's packaging of sentence-transformers/all-MiniLM-L6-v2 (384 dims).
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Name of the index directory created inside the documentation folder.
pub const DEFAULT_INDEX_DIR_NAME: &str = "vector_index";

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// `None` disables documentation search without failing startup.
    pub docs_dir: Option<PathBuf>,
    pub index_dir_override: Option<PathBuf>,
    pub ollama_url: String,
    pub embed_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docs_dir: None,
            index_dir_override: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Settings::default();
        Ok(Self {
            docs_dir: get(ENV_DOCS_DIR).map(PathBuf::from),
            index_dir_override: get(ENV_INDEX_DIR).map(PathBuf::from),
            ollama_url: get(ENV_OLLAMA_URL).unwrap_or(defaults.ollama_url),
            embed_model: get(ENV_EMBED_MODEL).unwrap_or(defaults.embed_model),
            chunk_size: parse_usize(ENV_CHUNK_SIZE, get(ENV_CHUNK_SIZE))?
                .unwrap_or(defaults.chunk_size),
            chunk_overlap: parse_usize(ENV_CHUNK_OVERLAP, get(ENV_CHUNK_OVERLAP))?
                .unwrap_or(defaults.chunk_overlap),
        })
    }

    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = Some(dir.into());
        self
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir_override = Some(dir.into());
        self
    }

    pub fn docs_search_enabled(&self) -> bool {
        self.docs_dir.is_some()
    }

    /// Resolved index directory: explicit override, else `<docs_dir>/vector_index`. `None`
    /// whenever no documentation directory is configured, override or not.
    pub fn index_dir(&self) -> Option<PathBuf> {
        let docs_dir = self.docs_dir.as_deref()?;
        Some(
            self.index_dir_override
                .clone()
                .unwrap_or_else(|| default_index_dir(docs_dir)),
        )
    }
}

pub fn default_index_dir(docs_dir: &Path) -> PathBuf {
    docs_dir.join(DEFAULT_INDEX_DIR_NAME)
}

fn parse_usize(key: &str, raw: Option<String>) -> Result<Option<usize>, AppError> {
    match raw {
        None => Ok(None),
        Some(v) => v.parse::<usize>().map(Some).map_err(|e| {
            AppError::new(codes::CONFIG_INVALID, "Configuration value must be a non-negative integer")
                .with_details(format!("key={key}; value={v}; err={e}"))
        }),
    }
}
