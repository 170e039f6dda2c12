//! Memory service orchestrating embedding and SQLite operations.
//!
//! Provides the high-level API used by the CLI and library callers:
//! storing with near-duplicate merging, semantic search, semantic forget,
//! relations, and workspace indexing.

mod crud;
mod index;
mod search;
mod store;
pub mod workspace;

pub use store::{AUTOSAVE_SOURCE, DEFAULT_SOURCE, MemoryService};
pub use workspace::{DirectorySource, FileSource};
