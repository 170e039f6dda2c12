//! recollect - local-first semantic memory.
//!
//! Stores short text memories with vector embeddings in SQLite, merges
//! near-duplicates on write, and retrieves by cosine similarity. Embeddings
//! come from a fallback chain: an OpenAI-compatible API, a local Ollama
//! server, then an in-process ONNX model that needs no configuration.
//! All operations are synchronous (no async/await required).
//!
//! # Example
//!
//! ```no_run
//! use recollect::{Category, Config, MemoryService, DEFAULT_SOURCE};
//!
//! let config = Config::load().expect("Failed to load config");
//! let mut memories = MemoryService::new(config);
//!
//! // Initialization happens on first use
//! let outcome = memories
//!     .store("Use tabs not spaces", Some(Category::Preference), DEFAULT_SOURCE)
//!     .expect("Failed to store");
//! println!("stored {} (merged: {})", outcome.id, outcome.is_duplicate);
//!
//! for hit in memories.search("indentation style", None, None).unwrap() {
//!     println!("{:.2}: {}", hit.score, hit.memory.content);
//! }
//! ```
//!
//! # Mutability Requirements
//!
//! `MemoryService` methods take `&mut self` because any of them may open the
//! store or build the embedding chain on first use.

pub mod config;
pub mod embedding;
pub mod errors;
pub mod memory;
pub mod memory_types;
pub mod sqlite;

// Re-export public API
pub use config::{Config, ProviderKind};
pub use embedding::{Embedder, EmbeddingChain, Provider, reconcile_dimension};
pub use errors::Error;
pub use memory::{AUTOSAVE_SOURCE, DEFAULT_SOURCE, DirectorySource, FileSource, MemoryService};
pub use memory_types::{
    Category, CategoryBoosts, IndexReport, MemorySearchResult, MemoryStats, Profile,
    RawStoreOutcome, RelatedMemory, StoreOptions, StoreOutcome,
};
pub use sqlite::{Database, MAX_SEARCH_LIMIT, Memory, cosine_similarity};
