//! Store, delete, link and read-side operations of the service.

use tracing::debug;

use crate::errors::Error;
use crate::memory_types::{
    Category, MemoryStats, Profile, RelatedMemory, StoreOptions, StoreOutcome,
};
use crate::sqlite::Memory;

use super::store::{AUTOSAVE_SOURCE, MemoryService, validate_text};

impl MemoryService {
    #[must_use = "handle the error or results may be lost"]
    /// Embed and store `text`, merging into a near-duplicate if one exists.
    ///
    /// Uses the configured dedupe threshold. `category` of `None` keeps a
    /// merged memory's category and means `other` for a new one.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Text is empty
    /// - Every embedding backend fails
    /// - Database operations fail
    pub fn store(
        &mut self,
        text: &str,
        category: Option<Category>,
        source: &str,
    ) -> Result<StoreOutcome, Error> {
        let mut options = StoreOptions::new(source)
            .with_dedupe_threshold(self.config.dedupe_threshold);
        options.category = category;
        self.store_with_options(text, &options)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Like [`store`](Self::store) with full control over tags and threshold.
    pub fn store_with_options(
        &mut self,
        text: &str,
        options: &StoreOptions,
    ) -> Result<StoreOutcome, Error> {
        validate_text(text)?;
        let embedding = self.embed(text)?;
        let outcome = self.initialized_db()?.store(text, &embedding, options)?;
        debug!(id = %outcome.id, duplicate = outcome.is_duplicate, "stored memory");
        Ok(outcome)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Store text captured without an explicit user request.
    ///
    /// Returns `Ok(None)` without touching anything when auto-capture is
    /// disabled. Otherwise stores under the autosave source and bumps the
    /// profile's capture count once.
    pub fn auto_capture(
        &mut self,
        text: &str,
        category: Option<Category>,
    ) -> Result<Option<StoreOutcome>, Error> {
        if !self.config.auto_capture {
            return Ok(None);
        }
        let outcome = self.store(text, category, AUTOSAVE_SOURCE)?;
        self.initialized_db()?.increment_capture_count()?;
        Ok(Some(outcome))
    }

    #[must_use = "handle the error or results may be lost"]
    /// Get a specific memory by ID.
    pub fn get(&mut self, id: &str) -> Result<Option<Memory>, Error> {
        self.initialized_db()?.get(id)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Newest memories first.
    pub fn list_recent(&mut self, limit: usize) -> Result<Vec<Memory>, Error> {
        self.initialized_db()?.list_recent(limit)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Delete a memory and its edges.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if memory was deleted
    /// - `Ok(false)` if memory didn't exist
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for an id that is not a UUID-v4.
    pub fn delete(&mut self, id: &str) -> Result<bool, Error> {
        self.initialized_db()?.delete(id)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Delete every memory with exactly this source. Returns the count.
    pub fn delete_by_source(&mut self, source: &str) -> Result<usize, Error> {
        self.initialized_db()?.delete_by_source(source)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Record a directed relation. Returns false if it already existed.
    pub fn link(&mut self, from_id: &str, to_id: &str, relation: &str) -> Result<bool, Error> {
        self.initialized_db()?.add_edge(from_id, to_id, relation)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Memories linked to `id` in either direction.
    pub fn related(&mut self, id: &str) -> Result<Vec<RelatedMemory>, Error> {
        self.initialized_db()?.get_related(id)
    }

    #[must_use = "handle the error or results may be lost"]
    pub fn stats(&mut self) -> Result<MemoryStats, Error> {
        self.initialized_db()?.stats()
    }

    #[must_use = "handle the error or results may be lost"]
    pub fn profile(&mut self) -> Result<Profile, Error> {
        self.initialized_db()?.profile()
    }

    #[must_use = "handle the error or results may be lost"]
    pub fn update_profile(&mut self, summary: &str, facts: &[String]) -> Result<(), Error> {
        self.initialized_db()?.update_profile(summary, facts)
    }
}
