//! Semantic search and semantic forget.

use tracing::{debug, info};

use crate::errors::Error;
use crate::memory_types::{CategoryBoosts, MemorySearchResult};

use super::store::{MemoryService, validate_text};

impl MemoryService {
    #[must_use = "handle the error or results may be lost"]
    /// Search memories by semantic similarity.
    ///
    /// `limit` and `min_score` fall back to the configured defaults.
    ///
    /// # Returns
    ///
    /// At most `limit` results scoring at least `min_score`, highest first.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Query is empty
    /// - Limit is 0 or exceeds the search cap
    /// - Every embedding backend fails
    /// - Database operations fail
    pub fn search(
        &mut self,
        query: &str,
        limit: Option<usize>,
        min_score: Option<f64>,
    ) -> Result<Vec<MemorySearchResult>, Error> {
        let query = query.trim();
        validate_text(query)?;
        let limit = limit.unwrap_or(self.config.default_limit);
        let min_score = min_score.unwrap_or(self.config.min_score);

        let embedding = self.embed(query)?;
        let results = self
            .initialized_db()?
            .vector_search(&embedding, limit, min_score)?;
        debug!(limit, min_score, hits = results.len(), "searched memories");
        Ok(results)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Search with per-category score multipliers.
    ///
    /// Boosted scores are capped at 1.0. Uses the configured minimum score.
    pub fn search_boosted(
        &mut self,
        query: &str,
        limit: Option<usize>,
        boosts: &CategoryBoosts,
    ) -> Result<Vec<MemorySearchResult>, Error> {
        let query = query.trim();
        validate_text(query)?;
        let limit = limit.unwrap_or(self.config.default_limit);
        let min_score = self.config.min_score;

        let embedding = self.embed(query)?;
        self.initialized_db()?
            .vector_search_boosted(&embedding, limit, min_score, boosts)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Delete up to 10 memories scoring at least `threshold` against `query`.
    ///
    /// Returns how many were deleted. Best effort: the count says what
    /// happened, not whether it matched what the caller meant.
    pub fn forget_by_query(&mut self, query: &str, threshold: f64) -> Result<usize, Error> {
        let query = query.trim();
        validate_text(query)?;
        let embedding = self.embed(query)?;
        let deleted = self.initialized_db()?.delete_by_query(&embedding, threshold)?;
        info!(threshold, deleted, "forgot memories by query");
        Ok(deleted)
    }
}
