//! Configuration validation logic.

use super::Config;
use crate::errors::Error;
use crate::sqlite::MAX_SEARCH_LIMIT;

/// Validate all configuration values for correctness and constraints.
///
/// Checks that:
/// - `min_score` and `dedupe_threshold` are between 0.0 and 1.0
/// - `embedding_dimension` is positive
/// - `default_limit` is between 1 and the search limit cap
/// - model names, URLs and the database path are not empty
/// - No NaN or infinite values
///
/// # Errors
///
/// Returns `Error::Config` if any validation check fails.
pub fn validate(config: &Config) -> Result<(), Error> {
    validate_unit_interval("min_score", config.min_score)?;
    validate_unit_interval("dedupe_threshold", config.dedupe_threshold)?;
    validate_dimension(config.embedding_dimension)?;
    validate_limit(config.default_limit)?;
    validate_not_empty("embedding_model", &config.embedding_model)?;
    validate_not_empty("openai_model", &config.openai_model)?;
    validate_not_empty("openai_base_url", &config.openai_base_url)?;
    validate_not_empty("ollama_model", &config.ollama_model)?;

    if config.database_path.as_os_str().is_empty() {
        return Err(Error::Config("Database path cannot be empty".to_string()));
    }

    Ok(())
}

fn validate_unit_interval(name: &str, value: f64) -> Result<(), Error> {
    if value.is_nan() || value.is_infinite() {
        return Err(Error::Config(format!(
            "Invalid {name}: NaN and infinity are not allowed"
        )));
    }

    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "Invalid {name}: {value} (must be between 0.0 and 1.0)"
        )));
    }

    Ok(())
}

fn validate_dimension(dimension: usize) -> Result<(), Error> {
    if dimension == 0 {
        return Err(Error::Config(
            "Invalid embedding_dimension: must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_limit(limit: usize) -> Result<(), Error> {
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(Error::Config(format!(
            "Invalid default_limit: {limit} (must be between 1 and {MAX_SEARCH_LIMIT})"
        )));
    }
    Ok(())
}

fn validate_not_empty(name: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_threshold_range_validation() {
        let mut config = Config::default();
        config.min_score = 1.5;
        assert!(matches!(validate(&config), Err(Error::Config(_))));

        let mut config = Config::default();
        config.dedupe_threshold = -0.1;
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_threshold_bounds_accepted() {
        let mut config = Config::default();
        config.min_score = 0.0;
        config.dedupe_threshold = 1.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_nan_and_infinity_rejected() {
        let mut config = Config::default();
        config.min_score = f64::NAN;
        assert!(matches!(validate(&config), Err(Error::Config(_))));

        let mut config = Config::default();
        config.dedupe_threshold = f64::INFINITY;
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_dimension_and_limit() {
        let mut config = Config::default();
        config.embedding_dimension = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.default_limit = 0;
        assert!(validate(&config).is_err());
        config.default_limit = MAX_SEARCH_LIMIT + 1;
        assert!(validate(&config).is_err());
        config.default_limit = MAX_SEARCH_LIMIT;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_strings_rejected() {
        let mut config = Config::default();
        config.embedding_model = "  ".to_string();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.database_path = PathBuf::new();
        assert!(validate(&config).is_err());
    }
}
