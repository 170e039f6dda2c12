//! Linear-scan semantic search and similarity-based delete.
//!
//! Every call decodes every stored embedding: O(n·D). That is fine for tens of
//! thousands of rows; beyond that the scan needs replacing with an index.

use rusqlite::Connection;
use tracing::{debug, warn};

use super::{delete_in, embedding, memory_from_row, Database, MEMORY_COLUMNS};
use crate::errors::Error;
use crate::memory_types::{CategoryBoosts, MemorySearchResult};

/// Maximum allowed limit for search operations.
pub const MAX_SEARCH_LIMIT: usize = 10_000;

/// Candidates considered by a semantic delete.
const FORGET_CANDIDATES: usize = 10;

/// Validate search limit is within acceptable bounds.
pub fn validate_limit(limit: usize) -> Result<(), Error> {
    if limit == 0 {
        return Err(Error::Validation(
            "Limit must be greater than 0".to_string(),
        ));
    }
    if limit > MAX_SEARCH_LIMIT {
        return Err(Error::Validation(format!(
            "Limit {} exceeds maximum allowed ({})",
            limit, MAX_SEARCH_LIMIT
        )));
    }
    Ok(())
}

pub(crate) fn validate_score(name: &str, value: f64) -> Result<(), Error> {
    if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
        return Err(Error::Validation(format!(
            "{name} must be between -1.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

/// Score every embedded row against `query`, keep those at or above
/// `min_score`, and sort highest first.
///
/// Rows without a decodable embedding are skipped.
pub(crate) fn scan_scored(
    conn: &Connection,
    dimension: usize,
    query: &[f64],
    min_score: f64,
) -> Result<Vec<MemorySearchResult>, Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE embedding IS NOT NULL"
    ))?;
    let rows = stmt.query_map([], |row| memory_from_row(row, dimension))?;

    let mut results = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let memory = row?;
        let Some(stored) = memory.embedding.as_deref() else {
            skipped += 1;
            continue;
        };
        let score = embedding::cosine_similarity(query, stored);
        if score >= min_score {
            results.push(MemorySearchResult { memory, score });
        }
    }
    if skipped > 0 {
        warn!(skipped, "skipped rows with undecodable embeddings");
    }

    sort_by_score(&mut results);
    Ok(results)
}

fn sort_by_score(results: &mut [MemorySearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

impl Database {
    /// Search for similar memories using cosine similarity.
    ///
    /// Returns at most `limit` results scoring at least `min_score`, highest first.
    ///
    /// # Errors
    ///
    /// Returns error if the limit is invalid or the query fails.
    pub fn vector_search(
        &self,
        query: &[f64],
        limit: usize,
        min_score: f64,
    ) -> Result<Vec<MemorySearchResult>, Error> {
        validate_limit(limit)?;
        validate_score("min_score", min_score)?;

        let mut results = scan_scored(self.conn()?, self.dimension, query, min_score)?;
        results.truncate(limit);
        Ok(results)
    }

    /// Like [`vector_search`](Self::vector_search), but takes `2 × limit`
    /// candidates, multiplies each score by its category's boost (capped at
    /// 1.0), then re-sorts and truncates to `limit`. `min_score` applies to
    /// both the raw and the boosted score, so a boost below 1.0 can drop a
    /// result.
    pub fn vector_search_boosted(
        &self,
        query: &[f64],
        limit: usize,
        min_score: f64,
        boosts: &CategoryBoosts,
    ) -> Result<Vec<MemorySearchResult>, Error> {
        validate_limit(limit)?;
        for (category, factor) in boosts {
            if !factor.is_finite() || *factor < 0.0 {
                return Err(Error::Validation(format!(
                    "boost for {category} must be a non-negative number, got {factor}"
                )));
            }
        }

        let candidates = limit.saturating_mul(2).min(MAX_SEARCH_LIMIT);
        let mut results = self.vector_search(query, candidates, min_score)?;
        for result in results.iter_mut() {
            if let Some(factor) = boosts.get(&result.memory.category) {
                result.score = (result.score * factor).min(1.0);
            }
        }
        results.retain(|result| result.score >= min_score);
        sort_by_score(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    /// Semantic "forget": delete up to 10 memories scoring at least `threshold`.
    ///
    /// Returns how many were deleted. The count is informational; how well it
    /// matches intent depends on the embedding quality.
    pub fn delete_by_query(&self, query: &[f64], threshold: f64) -> Result<usize, Error> {
        validate_score("threshold", threshold)?;
        let tx = self.conn()?.unchecked_transaction()?;
        let mut candidates = scan_scored(&tx, self.dimension, query, threshold)?;
        candidates.truncate(FORGET_CANDIDATES);

        let mut deleted = 0;
        for candidate in &candidates {
            if delete_in(&tx, &candidate.memory.id)? {
                deleted += 1;
            }
        }
        tx.commit()?;
        debug!(threshold, deleted, "deleted memories by query");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use crate::memory_types::{Category, StoreOptions};

    fn insert(db: &Database, content: &str, embedding: &[f64], category: Category) -> String {
        db.store(
            content,
            embedding,
            &StoreOptions::new("test")
                .with_category(category)
                .with_dedupe_threshold(1.0),
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(MAX_SEARCH_LIMIT + 1).is_err());
        assert!(validate_limit(10).is_ok());
        assert!(validate_limit(MAX_SEARCH_LIMIT).is_ok());
    }

    #[test]
    fn test_search_sorted_limited_and_filtered() {
        let db = test_db();
        for (i, score) in [0.2, 0.9, 0.5, 0.7, 0.35].iter().enumerate() {
            insert(&db, &format!("m{i}"), &with_score(*score), Category::Other);
        }

        let results = db.vector_search(&at_angle(0.0), 3, 0.3).unwrap();
        assert_eq!(results.len(), 3);
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(scores.iter().all(|s| *s >= 0.3));
        assert!((scores[0] - 0.9).abs() < 1e-9);

        let all = db.vector_search(&at_angle(0.0), 10, 0.3).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_search_invalid_limit() {
        let db = test_db();
        assert!(matches!(
            db.vector_search(&at_angle(0.0), 0, 0.0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.vector_search(&at_angle(0.0), MAX_SEARCH_LIMIT + 1, 0.0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_search_skips_unembedded_and_corrupt_rows() {
        let db = test_db();
        let good = insert(&db, "good", &at_angle(0.0), Category::Other);
        let corrupt = insert(&db, "corrupt", &at_angle(1.0), Category::Other);
        db.conn()
            .unwrap()
            .execute(
                "UPDATE memories SET embedding = X'0102' WHERE id = ?1",
                [&corrupt],
            )
            .unwrap();
        db.store_raw(None, "placeholder", "import", &[], Category::Other)
            .unwrap();

        let results = db.vector_search(&at_angle(0.0), 10, -1.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.id, good);
    }

    #[test]
    fn test_boost_promotes_category() {
        let db = test_db();
        let boosted = insert(&db, "prefer tabs", &with_score(0.4), Category::Preference);
        let plain = insert(&db, "some decision", &with_score(0.6), Category::Decision);

        let plain_results = db.vector_search(&at_angle(0.0), 1, 0.0).unwrap();
        assert_eq!(plain_results[0].memory.id, plain);

        let boosts = CategoryBoosts::from([(Category::Preference, 2.0)]);
        let results = db
            .vector_search_boosted(&at_angle(0.0), 1, 0.0, &boosts)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.id, boosted);
        assert!((results[0].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_boost_is_capped_at_one() {
        let db = test_db();
        insert(&db, "close", &with_score(0.9), Category::Decision);
        let boosts = CategoryBoosts::from([(Category::Decision, 3.0)]);
        let results = db
            .vector_search_boosted(&at_angle(0.0), 5, 0.0, &boosts)
            .unwrap();
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_boost_below_one_respects_min_score() {
        let db = test_db();
        insert(&db, "dampened", &with_score(0.7), Category::Other);
        let kept = insert(&db, "plain", &with_score(0.6), Category::Decision);

        let boosts = CategoryBoosts::from([(Category::Other, 0.5)]);
        let results = db
            .vector_search_boosted(&at_angle(0.0), 5, 0.5, &boosts)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.id, kept);
        assert!(results.iter().all(|r| r.score >= 0.5));
    }

    #[test]
    fn test_boost_rejects_negative_factor() {
        let db = test_db();
        let boosts = CategoryBoosts::from([(Category::Decision, -1.0)]);
        assert!(db
            .vector_search_boosted(&at_angle(0.0), 5, 0.0, &boosts)
            .is_err());
    }

    #[test]
    fn test_delete_by_query_removes_only_matches() {
        let db = test_db();
        let a = insert(&db, "a", &with_score(0.95), Category::Other);
        let b = insert(&db, "b", &with_score(0.85), Category::Other);
        let c = insert(&db, "c", &with_score(0.5), Category::Other);

        let deleted = db.delete_by_query(&at_angle(0.0), 0.8).unwrap();
        assert_eq!(deleted, 2);
        assert!(db.get(&a).unwrap().is_none());
        assert!(db.get(&b).unwrap().is_none());
        assert!(db.get(&c).unwrap().is_some());
    }

    #[test]
    fn test_delete_by_query_caps_candidates() {
        let db = test_db();
        for i in 0..12 {
            // tiny angle differences keep every row above the threshold
            insert(&db, &format!("near {i}"), &at_angle(i as f64 * 0.001), Category::Other);
        }
        assert_eq!(db.delete_by_query(&at_angle(0.0), 0.9).unwrap(), 10);
        assert_eq!(db.count().unwrap(), 2);
    }
}
