//! Parsing of individual environment variable values.

use std::path::{Path, PathBuf};

use crate::errors::Error;

use super::paths;

fn non_empty<'a>(name: &str, value: &'a str) -> Result<&'a str, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(trimmed)
}

pub fn parse_env_string(name: &str, value: &str) -> Result<String, Error> {
    non_empty(name, value).map(str::to_string)
}

/// Parse as a path, expanding `~`.
pub fn parse_env_path(name: &str, value: &str) -> Result<PathBuf, Error> {
    non_empty(name, value).map(|v| paths::expand_tilde(Path::new(v)))
}

/// Range checks happen later in validation.
pub fn parse_env_float(name: &str, value: &str) -> Result<f64, Error> {
    non_empty(name, value)?
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

pub fn parse_env_usize(name: &str, value: &str) -> Result<usize, Error> {
    non_empty(name, value)?
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
pub fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    match non_empty(name, value)?.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "Invalid {name} value: {other} (expected true or false)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_string_empty() {
        assert!(matches!(parse_env_string("TEST_VAR", ""), Err(Error::Config(_))));
        assert!(matches!(
            parse_env_string("TEST_VAR", "   "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_parse_env_string_valid() {
        assert_eq!(parse_env_string("TEST_VAR", " valid ").unwrap(), "valid");
    }

    #[test]
    fn test_parse_env_float() {
        assert_eq!(parse_env_float("TEST_FLOAT", "0.5").unwrap(), 0.5);
        assert!(matches!(
            parse_env_float("TEST_FLOAT", "invalid"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_parse_env_usize() {
        assert_eq!(parse_env_usize("TEST_N", "384").unwrap(), 384);
        assert!(parse_env_usize("TEST_N", "-1").is_err());
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("TEST_B", "TRUE").unwrap());
        assert!(parse_env_bool("TEST_B", "on").unwrap());
        assert!(!parse_env_bool("TEST_B", "0").unwrap());
        assert!(!parse_env_bool("TEST_B", "No").unwrap());
        assert!(matches!(
            parse_env_bool("TEST_B", "maybe"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_parse_env_path_keeps_absolute() {
        assert_eq!(
            parse_env_path("TEST_PATH", "/tmp/db.sqlite").unwrap(),
            PathBuf::from("/tmp/db.sqlite")
        );
    }
}
