//! Default locations and `~` expansion.

use std::path::{Path, PathBuf};

/// `~/.recollect`, falling back to `$HOME` and then the working directory.
pub fn recollect_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    home.join(".recollect")
}

pub fn default_database_path() -> PathBuf {
    recollect_home().join("memories.db")
}

pub fn default_model_cache() -> PathBuf {
    recollect_home().join("models")
}

/// `<config_dir>/recollect/config.toml`.
pub fn config_file_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("recollect").join("config.toml")
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let path = expand_tilde(Path::new("~/notes/memories.db"));
        assert!(path.starts_with(&home));
        assert!(path.ends_with("notes/memories.db"));
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(
            expand_tilde(Path::new("/absolute/path")),
            PathBuf::from("/absolute/path")
        );
        // only a whole leading component counts
        assert_eq!(expand_tilde(Path::new("~user/x")), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_defaults_live_under_recollect_home() {
        assert!(default_database_path().ends_with(".recollect/memories.db"));
        assert!(default_model_cache().ends_with(".recollect/models"));
        assert!(config_file_path().ends_with("recollect/config.toml"));
    }
}
