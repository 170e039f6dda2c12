//! Writes: deduplicating store and the two-phase raw import path.

use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::search::scan_scored;
use super::{
    memory_from_row, now_millis, validate_memory_id, vec_to_blob, Database, Memory, MEMORY_COLUMNS,
};
use crate::errors::Error;
use crate::memory_types::{Category, RawStoreOutcome, StoreOptions, StoreOutcome};

fn validate_content(content: &str) -> Result<(), Error> {
    if content.trim().is_empty() {
        return Err(Error::Validation("memory content cannot be empty".to_string()));
    }
    Ok(())
}

impl Database {
    /// Store a memory, merging into a near-duplicate when one exists.
    ///
    /// If the best-scoring existing memory reaches `opts.dedupe_threshold`, it
    /// is overwritten in place (content, embedding, created_at, source, tags;
    /// category only when `opts.category` is set) and its id is returned with
    /// `is_duplicate = true`. Otherwise a new row is inserted.
    ///
    /// # Errors
    ///
    /// Returns error if the content is empty, the embedding has the wrong
    /// dimension, the threshold is outside 0.0..=1.0, or the write fails.
    pub fn store(
        &self,
        content: &str,
        embedding: &[f64],
        opts: &StoreOptions,
    ) -> Result<StoreOutcome, Error> {
        validate_content(content)?;
        if !(0.0..=1.0).contains(&opts.dedupe_threshold) {
            return Err(Error::Validation(format!(
                "dedupe threshold must be between 0.0 and 1.0, got {}",
                opts.dedupe_threshold
            )));
        }
        let blob = vec_to_blob(embedding, self.dimension)?;
        let tags = serde_json::to_string(&opts.tags)?;
        let now = now_millis();

        let tx = self.conn()?.unchecked_transaction()?;
        let best = scan_scored(&tx, self.dimension, embedding, opts.dedupe_threshold)?
            .into_iter()
            .next();

        let outcome = match best {
            Some(hit) => {
                let category = opts.category.unwrap_or(hit.memory.category);
                tx.execute(
                    r#"
                    UPDATE memories
                    SET content = ?1, embedding = ?2, created_at = ?3, source = ?4,
                        tags = ?5, category = ?6
                    WHERE id = ?7
                    "#,
                    params![
                        content,
                        &blob,
                        now,
                        &opts.source,
                        &tags,
                        category.as_str(),
                        &hit.memory.id
                    ],
                )?;
                debug!(id = %hit.memory.id, score = hit.score, "merged near-duplicate memory");
                StoreOutcome {
                    id: hit.memory.id,
                    is_duplicate: true,
                }
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let category = opts.category.unwrap_or_default();
                tx.execute(
                    r#"
                    INSERT INTO memories (id, content, embedding, created_at, source, tags, category)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![&id, content, &blob, now, &opts.source, &tags, category.as_str()],
                )?;
                debug!(id = %id, "inserted memory");
                StoreOutcome {
                    id,
                    is_duplicate: false,
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Raw bulk-import write that never embeds.
    ///
    /// With an id: overwrite that row if it exists (clearing the embedding when
    /// the content changed), otherwise insert under that id. Without an id:
    /// return the existing row whose content is byte-identical, otherwise
    /// insert a placeholder with no embedding. Fill embeddings in later with
    /// [`set_embedding`](Self::set_embedding).
    pub fn store_raw(
        &self,
        id: Option<&str>,
        content: &str,
        source: &str,
        tags: &[String],
        category: Category,
    ) -> Result<RawStoreOutcome, Error> {
        validate_content(content)?;
        if let Some(id) = id {
            validate_memory_id(id)?;
        }
        let tags = serde_json::to_string(tags)?;
        let now = now_millis();

        let tx = self.conn()?.unchecked_transaction()?;
        let outcome = match id {
            Some(id) => {
                let updated = tx.execute(
                    r#"
                    UPDATE memories
                    SET embedding = CASE WHEN content = ?1 THEN embedding ELSE NULL END,
                        content = ?1, created_at = ?2, source = ?3, tags = ?4, category = ?5
                    WHERE id = ?6
                    "#,
                    params![content, now, source, &tags, category.as_str(), id],
                )?;
                if updated > 0 {
                    RawStoreOutcome::Updated { id: id.to_string() }
                } else {
                    insert_placeholder(&tx, id, content, now, source, &tags, category)?;
                    RawStoreOutcome::Inserted { id: id.to_string() }
                }
            }
            None => {
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT id FROM memories WHERE content = ?1 LIMIT 1",
                        [content],
                        |row| row.get(0),
                    )
                    .optional()?;
                match existing {
                    Some(id) => RawStoreOutcome::Duplicate { id },
                    None => {
                        let id = Uuid::new_v4().to_string();
                        insert_placeholder(&tx, &id, content, now, source, &tags, category)?;
                        RawStoreOutcome::Inserted { id }
                    }
                }
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Set the embedding of an existing memory. Returns false if no such row.
    pub fn set_embedding(&self, id: &str, embedding: &[f64]) -> Result<bool, Error> {
        validate_memory_id(id)?;
        let blob = vec_to_blob(embedding, self.dimension)?;
        let rows = self.conn()?.execute(
            "UPDATE memories SET embedding = ?1 WHERE id = ?2",
            params![&blob, id],
        )?;
        Ok(rows > 0)
    }

    /// Memories from `source` whose tag list contains `tag`, newest first.
    pub fn memories_with_tag(&self, source: &str, tag: &str) -> Result<Vec<Memory>, Error> {
        let conn = self.conn()?;
        let dimension = self.dimension;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories \
             WHERE source = ?1 \
               AND EXISTS (SELECT 1 FROM json_each(memories.tags) WHERE json_each.value = ?2) \
             ORDER BY created_at DESC"
        ))?;
        let memories = stmt
            .query_map(params![source, tag], |row| memory_from_row(row, dimension))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// Memories that still have no embedding, oldest first.
    pub fn pending_embeddings(&self, limit: usize) -> Result<Vec<Memory>, Error> {
        super::validate_limit(limit)?;
        let conn = self.conn()?;
        let dimension = self.dimension;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE embedding IS NULL \
             ORDER BY created_at ASC LIMIT ?1"
        ))?;
        let memories = stmt
            .query_map([limit as i64], |row| memory_from_row(row, dimension))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }
}

fn insert_placeholder(
    conn: &rusqlite::Connection,
    id: &str,
    content: &str,
    now: i64,
    source: &str,
    tags: &str,
    category: Category,
) -> Result<(), Error> {
    conn.execute(
        r#"
        INSERT INTO memories (id, content, embedding, created_at, source, tags, category)
        VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6)
        "#,
        params![id, content, now, source, tags, category.as_str()],
    )?;
    Ok(())
}
