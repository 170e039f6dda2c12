//! Configuration file loading and parsing.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ProviderKind;
use crate::errors::Error;

/// Configuration loaded from TOML. Absent keys keep the lower-priority value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub database_path: Option<PathBuf>,
    pub embedding_provider: Option<ProviderKind>,
    pub embedding_model: Option<String>,
    pub model_cache: Option<PathBuf>,
    pub embedding_dimension: Option<usize>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub auto_capture: Option<bool>,
    pub default_limit: Option<usize>,
    pub min_score: Option<f64>,
    pub dedupe_threshold: Option<f64>,
}

/// Read and parse `path`. A missing file is not an error.
pub fn load_from_path(path: &Path) -> Result<Option<ConfigFile>, Error> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file {}: {e}",
            path.display()
        ))
    })?;

    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_toml() {
        let content = r#"
This is not valid TOML
 [[unclosed bracket
 "#;
        let result: Result<ConfigFile, _> = toml::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_config_file() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert!(config.database_path.is_none());
        assert!(config.embedding_provider.is_none());
        assert!(config.min_score.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let content = r#"
            database_path = "/test/db.db"
            embedding_provider = "ollama"
            ollama_url = "http://localhost:11434"
            auto_capture = false
        "#;
        let config: ConfigFile = toml::from_str(content).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/test/db.db")));
        assert_eq!(config.embedding_provider, Some(ProviderKind::Ollama));
        assert_eq!(config.auto_capture, Some(false));
        assert!(config.dedupe_threshold.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str("similarity_treshold = 0.5");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(load_from_path(&path).unwrap().is_none());

        std::fs::write(&path, "default_limit = 12\n").unwrap();
        let file = load_from_path(&path).unwrap().unwrap();
        assert_eq!(file.default_limit, Some(12));

        std::fs::write(&path, "default_limit = \"twelve\"\n").unwrap();
        assert!(matches!(load_from_path(&path), Err(Error::Config(_))));
    }
}
