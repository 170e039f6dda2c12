//! Two-phase workspace import: placeholders first, embeddings second.

use tracing::{debug, info, warn};

use crate::errors::Error;
use crate::memory_types::{Category, IndexReport, RawStoreOutcome};
use crate::sqlite::MAX_SEARCH_LIMIT;

use super::store::MemoryService;
use super::workspace::{FileSource, INDEX_SOURCE, index_entry};

impl MemoryService {
    /// Import every file `source` lists as a `project-index` memory.
    ///
    /// Each file is written as a placeholder without an embedding, then
    /// embedded. A file already indexed under the same path is overwritten
    /// in place, so each path keeps a single row. A file whose stored text
    /// is unchanged counts as `unchanged`; a file that cannot be read, is
    /// empty, or fails to embed counts as `skipped` and never aborts the run. Rows that
    /// failed to embed stay pending for [`embed_pending`](Self::embed_pending).
    ///
    /// # Errors
    ///
    /// Only initialization, listing and database failures are returned.
    pub fn index_workspace(&mut self, source: &dyn FileSource) -> Result<IndexReport, Error> {
        self.ensure_initialized()?;
        let files = source.list()?;
        let mut report = IndexReport::default();
        let mut to_embed = Vec::new();

        {
            let db = self.database()?;
            for path in &files {
                let content = match source.read(path) {
                    Ok(content) if !content.trim().is_empty() => content,
                    Ok(_) => {
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "failed to read file for indexing");
                        report.skipped += 1;
                        continue;
                    }
                };

                let tags = vec![INDEX_SOURCE.to_string(), path.clone()];
                let entry = index_entry(path, &content);

                // one row per path; the newest wins and older copies go
                let existing = db.memories_with_tag(INDEX_SOURCE, path)?;
                if let Some((current, stale)) = existing.split_first() {
                    for old in stale {
                        db.delete(&old.id)?;
                    }
                    if current.content == entry && current.embedding.is_some() {
                        report.unchanged += 1;
                    } else {
                        db.store_raw(Some(&current.id), &entry, INDEX_SOURCE, &tags, Category::Other)?;
                        debug!(path = %path, id = %current.id, "file changed, replacing index entry");
                        to_embed.push((path.clone(), current.id.clone(), entry));
                    }
                    continue;
                }

                match db.store_raw(None, &entry, INDEX_SOURCE, &tags, Category::Other)? {
                    RawStoreOutcome::Duplicate { id } => {
                        // a previous run may have been interrupted before embedding
                        if db.get(&id)?.is_some_and(|m| m.embedding.is_none()) {
                            to_embed.push((path.clone(), id, entry));
                        } else {
                            report.unchanged += 1;
                        }
                    }
                    RawStoreOutcome::Inserted { id } | RawStoreOutcome::Updated { id } => {
                        to_embed.push((path.clone(), id, entry));
                    }
                }
            }
        }

        for (path, id, entry) in to_embed {
            match self.embed(&entry) {
                Ok(embedding) => {
                    self.database()?.set_embedding(&id, &embedding)?;
                    report.indexed += 1;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "failed to embed file, left pending");
                    report.skipped += 1;
                }
            }
        }

        info!(
            indexed = report.indexed,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "workspace indexed"
        );
        Ok(report)
    }

    /// Embed rows that were stored without an embedding.
    ///
    /// Returns how many were embedded. Rows whose embedding fails are left
    /// pending and logged.
    pub fn embed_pending(&mut self) -> Result<usize, Error> {
        let pending = self.initialized_db()?.pending_embeddings(MAX_SEARCH_LIMIT)?;
        let mut embedded = 0;
        for memory in pending {
            match self.embed(&memory.content) {
                Ok(embedding) => {
                    if self.database()?.set_embedding(&memory.id, &embedding)? {
                        embedded += 1;
                    }
                }
                Err(e) => warn!(id = %memory.id, error = %e, "failed to embed pending memory"),
            }
        }
        debug!(embedded, "embedded pending memories");
        Ok(embedded)
    }
}
