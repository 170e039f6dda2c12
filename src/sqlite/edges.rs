//! Directed, labelled relations between memories.

use rusqlite::params;
use uuid::Uuid;

use super::{memory_from_row, now_millis, validate_memory_id, Database};
use crate::errors::Error;
use crate::memory_types::RelatedMemory;

impl Database {
    /// Link two memories. Re-adding an existing `(from, to, relation)` is a no-op.
    ///
    /// Returns true if a new edge was created.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for malformed ids or an empty relation, and a
    /// storage error if either endpoint does not exist.
    pub fn add_edge(&self, from_id: &str, to_id: &str, relation: &str) -> Result<bool, Error> {
        validate_memory_id(from_id)?;
        validate_memory_id(to_id)?;
        if relation.trim().is_empty() {
            return Err(Error::Validation("relation cannot be empty".to_string()));
        }

        let rows = self.conn()?.execute(
            r#"
            INSERT OR IGNORE INTO memory_edges (id, from_id, to_id, relation, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                Uuid::new_v4().to_string(),
                from_id,
                to_id,
                relation,
                now_millis()
            ],
        )?;
        Ok(rows > 0)
    }

    /// Remove one edge. Returns true if it existed.
    pub fn remove_edge(&self, from_id: &str, to_id: &str, relation: &str) -> Result<bool, Error> {
        validate_memory_id(from_id)?;
        validate_memory_id(to_id)?;
        let rows = self.conn()?.execute(
            "DELETE FROM memory_edges WHERE from_id = ?1 AND to_id = ?2 AND relation = ?3",
            params![from_id, to_id, relation],
        )?;
        Ok(rows > 0)
    }

    /// Memories linked to `id` in either direction, newest edge first.
    ///
    /// The queried memory itself is never part of the result.
    pub fn get_related(&self, id: &str) -> Result<Vec<RelatedMemory>, Error> {
        validate_memory_id(id)?;
        let conn = self.conn()?;
        let dimension = self.dimension;
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.content, m.embedding, m.created_at, m.source, m.tags, m.category,
                   e.relation
            FROM memory_edges e
            JOIN memories m
              ON m.id = CASE WHEN e.from_id = ?1 THEN e.to_id ELSE e.from_id END
            WHERE (e.from_id = ?1 OR e.to_id = ?1) AND m.id != ?1
            ORDER BY e.created_at DESC
            "#,
        )?;
        let related = stmt
            .query_map([id], |row| {
                Ok(RelatedMemory {
                    memory: memory_from_row(row, dimension)?,
                    relation: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(related)
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> Result<usize, Error> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM memory_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
