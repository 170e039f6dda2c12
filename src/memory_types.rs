//! Memory store data types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::sqlite::Memory;

/// Default similarity at or above which `store` merges into an existing memory.
pub const DEFAULT_DEDUPE_THRESHOLD: f64 = 0.95;

/// Closed set of memory categories.
///
/// Stored as free text; anything unrecognised reads back as [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Decision,
    Preference,
    CodePattern,
    ErrorFix,
    Architecture,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Decision,
        Category::Preference,
        Category::CodePattern,
        Category::ErrorFix,
        Category::Architecture,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Decision => "decision",
            Category::Preference => "preference",
            Category::CodePattern => "code-pattern",
            Category::ErrorFix => "error-fix",
            Category::Architecture => "architecture",
            Category::Other => "other",
        }
    }

    /// Read a category column, mapping unknown text to `Other`.
    pub fn from_column(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| Error::Validation(format!("unknown category: {s}")))
    }
}

/// Options for [`Database::store`](crate::sqlite::Database::store).
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Provenance tag, e.g. `"recollect:cli"`.
    pub source: String,
    pub tags: Vec<String>,
    /// `None` keeps the existing category on merge and means `Other` on insert.
    pub category: Option<Category>,
    pub dedupe_threshold: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            source: String::new(),
            tags: Vec::new(),
            category: None,
            dedupe_threshold: DEFAULT_DEDUPE_THRESHOLD,
        }
    }
}

impl StoreOptions {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_dedupe_threshold(mut self, threshold: f64) -> Self {
        self.dedupe_threshold = threshold;
        self
    }
}

/// Result of a deduplicating store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreOutcome {
    /// Id of the inserted row, or of the row that was overwritten.
    pub id: String,
    pub is_duplicate: bool,
}

/// Result of the raw bulk-import path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RawStoreOutcome {
    /// New placeholder row without an embedding.
    Inserted { id: String },
    /// Row with the given id already existed and was overwritten.
    Updated { id: String },
    /// An existing row has byte-identical content.
    Duplicate { id: String },
}

impl RawStoreOutcome {
    pub fn id(&self) -> &str {
        match self {
            RawStoreOutcome::Inserted { id }
            | RawStoreOutcome::Updated { id }
            | RawStoreOutcome::Duplicate { id } => id,
        }
    }
}

/// A memory paired with its (possibly boosted) similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySearchResult {
    pub memory: Memory,
    pub score: f64,
}

/// A memory reached through an edge, with the edge's label.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedMemory {
    pub memory: Memory,
    pub relation: String,
}

/// Per-category score multipliers for boosted search.
pub type CategoryBoosts = HashMap<Category, f64>;

/// Aggregate counts computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_memories: usize,
    pub by_category: HashMap<String, usize>,
    pub edge_count: usize,
    /// Most recent `created_at` in epoch milliseconds.
    pub last_created_at: Option<i64>,
}

/// The singleton profile row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub summary: String,
    pub facts: Vec<String>,
    pub updated_at: i64,
    pub capture_count: u64,
}

/// Outcome of a workspace indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Files stored (new or changed) and embedded.
    pub indexed: usize,
    /// Files whose content was already stored verbatim.
    pub unchanged: usize,
    /// Files that could not be read, stored, or embedded.
    pub skipped: usize,
}
