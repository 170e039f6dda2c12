//! SQLite backend for recollect memory storage.
//!
//! This module provides:
//! - `Database`: connection, schema management and the memory store operations
//! - `Memory`: data structure for stored memories
//! - `embedding`: BLOB conversion and cosine similarity
//! - `search`: linear-scan semantic search and semantic delete
//! - `store`: deduplicating writes and the raw bulk-import path
//! - `edges`: relations between memories
//! - `profile`: profile singleton and sync cursors

pub mod embedding;
mod edges;
mod profile;
mod search;
mod store;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Error;
use crate::memory_types::{Category, MemoryStats};

pub use self::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
pub use self::search::{validate_limit, MAX_SEARCH_LIMIT};

/// Column list matching [`memory_from_row`].
pub(crate) const MEMORY_COLUMNS: &str =
    "id, content, embedding, created_at, source, tags, category";

/// A single stored memory.
#[derive(Debug, Clone, Serialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    /// `None` for placeholder rows from the bulk-import path, or rows whose
    /// blob does not match the store's dimension.
    #[serde(skip)]
    pub embedding: Option<Vec<f64>>,
    /// Epoch milliseconds; on merge this is the time of the merge.
    pub created_at: i64,
    pub source: String,
    pub tags: Vec<String>,
    pub category: Category,
}

/// SQLite database backend holding memories, edges, profile and sync state.
pub struct Database {
    conn: Option<Connection>,
    path: PathBuf,
    dimension: usize,
}

/// Apply connection pragmas: WAL journal and enforced foreign keys.
fn configure_pragmas(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA busy_timeout=5000;
        PRAGMA foreign_keys=ON;
        "#,
    )?;
    Ok(())
}

/// Create every table and index if missing. Safe to run against an existing file.
fn create_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            embedding BLOB,
            created_at INTEGER NOT NULL,
            source TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]',
            category TEXT NOT NULL DEFAULT 'other'
        );

        CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);
        CREATE INDEX IF NOT EXISTS idx_memories_source ON memories(source);
        CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);

        CREATE TABLE IF NOT EXISTS memory_edges (
            id TEXT PRIMARY KEY,
            from_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            to_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            relation TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(from_id, to_id, relation)
        );

        CREATE INDEX IF NOT EXISTS idx_edges_from ON memory_edges(from_id);
        CREATE INDEX IF NOT EXISTS idx_edges_to ON memory_edges(to_id);

        CREATE TABLE IF NOT EXISTS profile (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            summary TEXT NOT NULL DEFAULT '',
            facts TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL DEFAULT 0,
            capture_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS sync_state (
            peer_id TEXT PRIMARY KEY,
            last_sync_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn open_connection(path: &Path) -> Result<Connection, Error> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Map a row selected with [`MEMORY_COLUMNS`] into a [`Memory`].
pub(crate) fn memory_from_row(row: &Row<'_>, dimension: usize) -> rusqlite::Result<Memory> {
    let blob: Option<Vec<u8>> = row.get(2)?;
    let tags: String = row.get(5)?;
    let category: String = row.get(6)?;
    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        embedding: blob.and_then(|b| blob_to_vec(&b, dimension)),
        created_at: row.get(3)?,
        source: row.get(4)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        category: Category::from_column(&category),
    })
}

/// Reject anything that is not a hyphenated UUID-v4 string.
pub fn validate_memory_id(id: &str) -> Result<(), Error> {
    let valid = id.len() == 36
        && Uuid::try_parse(id).is_ok_and(|uuid| uuid.get_version_num() == 4);
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid memory id: {id:?}")))
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Database {
    /// Open or create a SQLite database at the given path.
    ///
    /// `dimension` is the embedding width every stored blob must have. Pass
    /// `":memory:"` as the path for a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or schema initialization fails.
    pub fn open(path: &Path, dimension: usize) -> Result<Self, Error> {
        if dimension == 0 {
            return Err(Error::Validation(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        let conn = open_connection(path)?;
        debug!(path = %path.display(), dimension, "opened memory database");
        Ok(Self {
            conn: Some(conn),
            path: path.to_path_buf(),
            dimension,
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(dimension: usize) -> Result<Self, Error> {
        Self::open(Path::new(":memory:"), dimension)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether the handle is present and answers a trivial query.
    pub fn is_open(&self) -> bool {
        self.conn.as_ref().is_some_and(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok()
        })
    }

    /// Close the current handle (errors swallowed) and open a fresh one,
    /// reapplying the schema.
    pub fn reopen(&mut self) -> Result<(), Error> {
        self.close();
        self.conn = Some(open_connection(&self.path)?);
        debug!(path = %self.path.display(), "reopened memory database");
        Ok(())
    }

    /// Close the handle. Later operations fail with `Error::NotInitialized`
    /// until [`reopen`](Self::reopen) succeeds.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "error while closing memory database");
            }
        }
    }

    pub(crate) fn conn(&self) -> Result<&Connection, Error> {
        self.conn.as_ref().ok_or(Error::NotInitialized)
    }

    /// Retrieve a single memory by ID. Returns `None` if it does not exist.
    pub fn get(&self, id: &str) -> Result<Option<Memory>, Error> {
        let conn = self.conn()?;
        let dimension = self.dimension;
        let memory = conn
            .query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                [id],
                |row| memory_from_row(row, dimension),
            )
            .optional()?;
        Ok(memory)
    }

    /// Total number of memories.
    pub fn count(&self) -> Result<usize, Error> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// List memories, newest first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Memory>, Error> {
        validate_limit(limit)?;
        let conn = self.conn()?;
        let dimension = self.dimension;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories ORDER BY created_at DESC LIMIT ?1"
        ))?;
        let memories = stmt
            .query_map([limit as i64], |row| memory_from_row(row, dimension))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// List memories of one category, newest first.
    pub fn list_by_category(&self, category: Category, limit: usize) -> Result<Vec<Memory>, Error> {
        validate_limit(limit)?;
        let conn = self.conn()?;
        let dimension = self.dimension;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE category = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))?;
        let memories = stmt
            .query_map(params![category.as_str(), limit as i64], |row| {
                memory_from_row(row, dimension)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// Delete a memory by ID, removing its edges first.
    ///
    /// Returns true if a memory was deleted, false if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a malformed id, before touching the table.
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        validate_memory_id(id)?;
        let tx = self.conn()?.unchecked_transaction()?;
        let deleted = delete_in(&tx, id)?;
        tx.commit()?;
        Ok(deleted)
    }

    /// Delete every memory whose source equals `source` exactly.
    ///
    /// Returns the number of memories removed.
    pub fn delete_by_source(&self, source: &str) -> Result<usize, Error> {
        let tx = self.conn()?.unchecked_transaction()?;
        let ids = {
            let mut stmt = tx.prepare("SELECT id FROM memories WHERE source = ?1")?;
            stmt.query_map([source], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let mut deleted = 0;
        for id in &ids {
            if delete_in(&tx, id)? {
                deleted += 1;
            }
        }
        tx.commit()?;
        debug!(source, deleted, "deleted memories by source");
        Ok(deleted)
    }

    /// Aggregate counts, computed on demand.
    pub fn stats(&self) -> Result<MemoryStats, Error> {
        let conn = self.conn()?;
        let (total, last_created_at): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MAX(created_at) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare("SELECT category, COUNT(*) FROM memories GROUP BY category")?;
        let mut by_category = std::collections::HashMap::new();
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })? {
            let (category, count) = row?;
            *by_category
                .entry(Category::from_column(&category).as_str().to_string())
                .or_insert(0) += count as usize;
        }

        Ok(MemoryStats {
            total_memories: total as usize,
            by_category,
            edge_count: self.edge_count()?,
            last_created_at,
        })
    }
}

/// Delete one memory and its edges inside an open transaction.
fn delete_in(conn: &Connection, id: &str) -> Result<bool, Error> {
    conn.execute(
        "DELETE FROM memory_edges WHERE from_id = ?1 OR to_id = ?1",
        [id],
    )?;
    let rows = conn.execute("DELETE FROM memories WHERE id = ?1", [id])?;
    Ok(rows > 0)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::Database;

    pub const DIM: usize = 4;

    pub fn test_db() -> Database {
        Database::open_in_memory(DIM).unwrap()
    }

    /// Unit vector at `angle` radians in the first two dimensions, so the
    /// similarity between two of them is `cos(a - b)`.
    pub fn at_angle(angle: f64) -> Vec<f64> {
        vec![angle.cos(), angle.sin(), 0.0, 0.0]
    }

    /// Vector whose similarity with `at_angle(0.0)` is exactly `score`.
    pub fn with_score(score: f64) -> Vec<f64> {
        at_angle(score.acos())
    }
}
