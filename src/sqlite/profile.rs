//! Profile singleton and per-peer sync cursors.

use rusqlite::{params, OptionalExtension};

use super::{now_millis, Database};
use crate::errors::Error;
use crate::memory_types::Profile;

const PROFILE_ID: i64 = 1;

impl Database {
    fn ensure_profile_row(&self) -> Result<(), Error> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO profile (id, summary, facts, updated_at, capture_count) \
             VALUES (?1, '', '[]', 0, 0)",
            [PROFILE_ID],
        )?;
        Ok(())
    }

    /// Read the profile, creating the empty singleton row on first access.
    pub fn profile(&self) -> Result<Profile, Error> {
        self.ensure_profile_row()?;
        let (summary, facts, updated_at, capture_count): (String, String, i64, i64) =
            self.conn()?.query_row(
                "SELECT summary, facts, updated_at, capture_count FROM profile WHERE id = ?1",
                [PROFILE_ID],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        Ok(Profile {
            summary,
            facts: serde_json::from_str(&facts).unwrap_or_default(),
            updated_at,
            capture_count: capture_count.max(0) as u64,
        })
    }

    /// Replace the profile summary and facts. The capture count is untouched.
    pub fn update_profile(&self, summary: &str, facts: &[String]) -> Result<(), Error> {
        self.ensure_profile_row()?;
        let facts = serde_json::to_string(facts)?;
        self.conn()?.execute(
            "UPDATE profile SET summary = ?1, facts = ?2, updated_at = ?3 WHERE id = ?4",
            params![summary, &facts, now_millis(), PROFILE_ID],
        )?;
        Ok(())
    }

    /// Count one auto-capture event. Returns the new count.
    pub fn increment_capture_count(&self) -> Result<u64, Error> {
        self.ensure_profile_row()?;
        let count: i64 = self.conn()?.query_row(
            "UPDATE profile SET capture_count = capture_count + 1, updated_at = ?1 \
             WHERE id = ?2 RETURNING capture_count",
            params![now_millis(), PROFILE_ID],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Last sync time recorded for a peer, in epoch milliseconds.
    pub fn last_sync(&self, peer_id: &str) -> Result<Option<i64>, Error> {
        let ts = self
            .conn()?
            .query_row(
                "SELECT last_sync_at FROM sync_state WHERE peer_id = ?1",
                [peer_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }

    /// Record the last sync time for a peer, replacing any earlier value.
    pub fn set_last_sync(&self, peer_id: &str, last_sync_at: i64) -> Result<(), Error> {
        if peer_id.trim().is_empty() {
            return Err(Error::Validation("peer id cannot be empty".to_string()));
        }
        self.conn()?.execute(
            r#"
            INSERT INTO sync_state (peer_id, last_sync_at) VALUES (?1, ?2)
            ON CONFLICT(peer_id) DO UPDATE SET last_sync_at = excluded.last_sync_at
            "#,
            params![peer_id, last_sync_at],
        )?;
        Ok(())
    }
}
