//! File enumeration for workspace indexing.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::errors::Error;

/// Content longer than this many characters is cut before storing.
pub const MAX_INDEX_CHARS: usize = 8_000;

/// Source and tag given to indexed files.
pub const INDEX_SOURCE: &str = "project-index";

/// Supplies the files a workspace index should cover.
///
/// Listing failures abort the run; per-file read failures are counted as
/// skipped and the run continues.
pub trait FileSource {
    /// Display paths of every candidate file.
    fn list(&self) -> Result<Vec<String>, Error>;

    /// Text content of one listed file.
    fn read(&self, path: &str) -> Result<String, Error>;
}

const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "dist", "build", "__pycache__"];

const TEXT_EXTENSIONS: &[&str] = &[
    "rs", "toml", "md", "txt", "json", "yaml", "yml", "py", "js", "jsx", "ts", "tsx", "go",
    "java", "kt", "c", "h", "cpp", "hpp", "cs", "rb", "php", "swift", "sh", "sql", "html",
    "css", "scss", "vue", "svelte", "ini", "cfg",
];

/// Walks a directory tree, skipping hidden and build directories and
/// anything without a known text extension.
pub struct DirectorySource {
    root: PathBuf,
    max_files: usize,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_files: 5_000,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl FileSource for DirectorySource {
    fn list(&self) -> Result<Vec<String>, Error> {
        if !self.root.is_dir() {
            return Err(Error::Validation(format!(
                "not a directory: {}",
                self.root.display()
            )));
        }

        let mut files: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry))
            .flatten()
            .filter(|entry| entry.file_type().is_file() && is_text_file(entry.path()))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.sort();
        files.truncate(self.max_files);
        Ok(files)
    }

    fn read(&self, path: &str) -> Result<String, Error> {
        Ok(std::fs::read_to_string(self.root.join(path))?)
    }
}

/// Cut `content` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Text stored for one indexed file: its path, a blank line, then the
/// (possibly truncated) content.
pub fn index_entry(path: &str, content: &str) -> String {
    format!("{path}\n\n{}", truncate_chars(content, MAX_INDEX_CHARS))
}
