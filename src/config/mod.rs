//! Configuration system for recollect.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::embedding::{
    DEFAULT_LOCAL_MODEL, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
    EMBEDDING_DIMS,
};
use crate::errors::Error;
use crate::memory_types::DEFAULT_DEDUPE_THRESHOLD;

pub use loader::ConfigFile;
pub use paths::{config_file_path, default_database_path, expand_tilde};

/// Which embedding backends sit in front of the in-process model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Every override that is configured (key or URL present).
    #[default]
    Auto,
    OpenAi,
    Ollama,
    /// In-process model only.
    Local,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ProviderKind::Auto),
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "local" => Ok(ProviderKind::Local),
            other => Err(Error::Config(format!(
                "unknown embedding provider: {other} (expected auto, openai, ollama or local)"
            ))),
        }
    }
}

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Clone)]
pub struct Config {
    /// Path to the SQLite database.
    pub database_path: PathBuf,

    pub embedding_provider: ProviderKind,

    /// HuggingFace identifier of the in-process embedding model.
    pub embedding_model: String,

    /// Directory for cached model files; `None` uses the HF Hub default.
    pub model_cache: Option<PathBuf>,

    /// Vector length of every stored embedding.
    pub embedding_dimension: usize,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,

    /// Base URL of a local Ollama server, e.g. `http://localhost:11434`.
    pub ollama_url: Option<String>,
    pub ollama_model: String,

    /// Whether `auto_capture` stores anything.
    pub auto_capture: bool,

    /// Result count used when a search does not name one.
    pub default_limit: usize,

    /// Minimum similarity for search results.
    pub min_score: f64,

    /// Similarity at or above which a store merges into an existing memory.
    pub dedupe_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: paths::default_database_path(),
            embedding_provider: ProviderKind::Auto,
            embedding_model: DEFAULT_LOCAL_MODEL.to_string(),
            model_cache: Some(paths::default_model_cache()),
            embedding_dimension: EMBEDDING_DIMS,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            ollama_url: None,
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            auto_capture: true,
            default_limit: 5,
            min_score: 0.3,
            dedupe_threshold: DEFAULT_DEDUPE_THRESHOLD,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("embedding_provider", &self.embedding_provider)
            .field("embedding_model", &self.embedding_model)
            .field("model_cache", &self.model_cache)
            .field("embedding_dimension", &self.embedding_dimension)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("ollama_url", &self.ollama_url)
            .field("ollama_model", &self.ollama_model)
            .field("auto_capture", &self.auto_capture)
            .field("default_limit", &self.default_limit)
            .field("min_score", &self.min_score)
            .field("dedupe_threshold", &self.dedupe_threshold)
            .finish()
    }
}

impl Config {
    /// Load configuration from the default file location and the process environment.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&paths::config_file_path())
    }

    /// Load configuration from `path` (if it exists) and the process environment.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let file = loader::load_from_path(path)?;
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Layer `file` and then `env` over the defaults, and validate the result.
    pub fn resolve(
        file: Option<ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Error> {
        let mut config = Config::default();
        if let Some(file) = file {
            config.merge_from_file(file);
        }
        overrides::apply_env_overrides(&mut config, env)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) {
        if let Some(path) = file.database_path {
            self.database_path = paths::expand_tilde(&path);
        }
        if let Some(provider) = file.embedding_provider {
            self.embedding_provider = provider;
        }
        if let Some(model) = file.embedding_model {
            self.embedding_model = model;
        }
        if let Some(cache) = file.model_cache {
            self.model_cache = Some(paths::expand_tilde(&cache));
        }
        if let Some(dimension) = file.embedding_dimension {
            self.embedding_dimension = dimension;
        }
        if file.openai_api_key.is_some() {
            self.openai_api_key = file.openai_api_key;
        }
        if let Some(model) = file.openai_model {
            self.openai_model = model;
        }
        if let Some(url) = file.openai_base_url {
            self.openai_base_url = url;
        }
        if file.ollama_url.is_some() {
            self.ollama_url = file.ollama_url;
        }
        if let Some(model) = file.ollama_model {
            self.ollama_model = model;
        }
        if let Some(auto_capture) = file.auto_capture {
            self.auto_capture = auto_capture;
        }
        if let Some(limit) = file.default_limit {
            self.default_limit = limit;
        }
        if let Some(min_score) = file.min_score {
            self.min_score = min_score;
        }
        if let Some(threshold) = file.dedupe_threshold {
            self.dedupe_threshold = threshold;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        validation::validate(self)
    }

    /// Ensure parent directories for database and cache paths exist.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!(
                        "Failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        if let Some(cache) = &self.model_cache {
            std::fs::create_dir_all(cache).map_err(|e| {
                Error::Config(format!(
                    "Failed to create model cache directory {}: {e}",
                    cache.display()
                ))
            })?;
        }

        Ok(())
    }
}
