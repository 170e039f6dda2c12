//! Environment variable overrides for configuration.

use super::{Config, env_parser};
use crate::errors::Error;

pub const DATABASE_PATH: &str = "RECOLLECT_DATABASE_PATH";
pub const EMBEDDING_PROVIDER: &str = "RECOLLECT_EMBEDDING_PROVIDER";
pub const EMBEDDING_MODEL: &str = "RECOLLECT_EMBEDDING_MODEL";
pub const MODEL_CACHE: &str = "RECOLLECT_MODEL_CACHE";
pub const EMBEDDING_DIMENSION: &str = "RECOLLECT_EMBEDDING_DIMENSION";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const RECOLLECT_OPENAI_API_KEY: &str = "RECOLLECT_OPENAI_API_KEY";
pub const OPENAI_MODEL: &str = "RECOLLECT_OPENAI_MODEL";
pub const OPENAI_BASE_URL: &str = "RECOLLECT_OPENAI_BASE_URL";
pub const OLLAMA_URL: &str = "RECOLLECT_OLLAMA_URL";
pub const OLLAMA_MODEL: &str = "RECOLLECT_OLLAMA_MODEL";
pub const AUTO_CAPTURE: &str = "RECOLLECT_AUTO_CAPTURE";
pub const DEFAULT_LIMIT: &str = "RECOLLECT_DEFAULT_LIMIT";
pub const MIN_SCORE: &str = "RECOLLECT_MIN_SCORE";
pub const DEDUPE_THRESHOLD: &str = "RECOLLECT_DEDUPE_THRESHOLD";

/// Apply overrides read through `lookup`, which returns a variable's value if set.
///
/// `RECOLLECT_OPENAI_API_KEY` wins over the generic `OPENAI_API_KEY`.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(v) = lookup(DATABASE_PATH) {
        config.database_path = env_parser::parse_env_path(DATABASE_PATH, &v)?;
    }
    if let Some(v) = lookup(EMBEDDING_PROVIDER) {
        config.embedding_provider = env_parser::parse_env_string(EMBEDDING_PROVIDER, &v)?.parse()?;
    }
    if let Some(v) = lookup(EMBEDDING_MODEL) {
        config.embedding_model = env_parser::parse_env_string(EMBEDDING_MODEL, &v)?;
    }
    if let Some(v) = lookup(MODEL_CACHE) {
        config.model_cache = Some(env_parser::parse_env_path(MODEL_CACHE, &v)?);
    }
    if let Some(v) = lookup(EMBEDDING_DIMENSION) {
        config.embedding_dimension = env_parser::parse_env_usize(EMBEDDING_DIMENSION, &v)?;
    }
    for name in [OPENAI_API_KEY, RECOLLECT_OPENAI_API_KEY] {
        if let Some(v) = lookup(name) {
            config.openai_api_key = Some(env_parser::parse_env_string(name, &v)?);
        }
    }
    if let Some(v) = lookup(OPENAI_MODEL) {
        config.openai_model = env_parser::parse_env_string(OPENAI_MODEL, &v)?;
    }
    if let Some(v) = lookup(OPENAI_BASE_URL) {
        config.openai_base_url = env_parser::parse_env_string(OPENAI_BASE_URL, &v)?;
    }
    if let Some(v) = lookup(OLLAMA_URL) {
        config.ollama_url = Some(env_parser::parse_env_string(OLLAMA_URL, &v)?);
    }
    if let Some(v) = lookup(OLLAMA_MODEL) {
        config.ollama_model = env_parser::parse_env_string(OLLAMA_MODEL, &v)?;
    }
    if let Some(v) = lookup(AUTO_CAPTURE) {
        config.auto_capture = env_parser::parse_env_bool(AUTO_CAPTURE, &v)?;
    }
    if let Some(v) = lookup(DEFAULT_LIMIT) {
        config.default_limit = env_parser::parse_env_usize(DEFAULT_LIMIT, &v)?;
    }
    if let Some(v) = lookup(MIN_SCORE) {
        config.min_score = env_parser::parse_env_float(MIN_SCORE, &v)?;
    }
    if let Some(v) = lookup(DEDUPE_THRESHOLD) {
        config.dedupe_threshold = env_parser::parse_env_float(DEDUPE_THRESHOLD, &v)?;
    }
    Ok(())
}
