//! SQLite-backed progress ledger.

use super::ProgressLedger;
use crate::error::GlyphResult;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Ledger persisted in a SQLite database.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger at the given path.
    pub fn new(path: impl AsRef<Path>) -> GlyphResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.init_schema()?;
        tracing::debug!(path = %path.as_ref().display(), "Opened progress ledger");
        Ok(ledger)
    }

    /// Create an in-memory ledger (for testing)
    pub fn in_memory() -> GlyphResult<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> GlyphResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS symbol_progress (
                code TEXT PRIMARY KEY,
                completed INTEGER NOT NULL DEFAULT 0,
                stage2_recalls INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn upsert_row(conn: &Connection, code: &str) -> GlyphResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO symbol_progress (code, updated_at) VALUES (?1, ?2)",
            params![code, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl ProgressLedger for SqliteLedger {
    fn is_completed(&self, code: &str) -> GlyphResult<bool> {
        let conn = self.conn.lock()?;
        let completed: Option<i64> = conn
            .query_row(
                "SELECT completed FROM symbol_progress WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(completed.unwrap_or(0) != 0)
    }

    fn set_completed(&self, code: &str) -> GlyphResult<()> {
        let conn = self.conn.lock()?;
        Self::upsert_row(&conn, code)?;
        conn.execute(
            "UPDATE symbol_progress SET completed = 1, updated_at = ?2 WHERE code = ?1",
            params![code, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn stage2_recalls(&self, code: &str) -> GlyphResult<u32> {
        let conn = self.conn.lock()?;
        let recalls: Option<u32> = conn
            .query_row(
                "SELECT stage2_recalls FROM symbol_progress WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(recalls.unwrap_or(0))
    }

    fn increment_stage2_recalls(&self, code: &str) -> GlyphResult<u32> {
        let conn = self.conn.lock()?;
        Self::upsert_row(&conn, code)?;
        conn.execute(
            "UPDATE symbol_progress SET stage2_recalls = stage2_recalls + 1, updated_at = ?2 WHERE code = ?1",
            params![code, Utc::now().to_rfc3339()],
        )?;
        let recalls: u32 = conn.query_row(
            "SELECT stage2_recalls FROM symbol_progress WHERE code = ?1",
            params![code],
            |row| row.get(0),
        )?;
        Ok(recalls)
    }

    fn reset(&self) -> GlyphResult<()> {
        let conn = self.conn.lock()?;
        conn.execute("DELETE FROM symbol_progress", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let ledger = SqliteLedger::in_memory().unwrap();
        assert!(!ledger.is_completed("03B1").unwrap());
        ledger.set_completed("03B1").unwrap();
        assert!(ledger.is_completed("03B1").unwrap());
        assert_eq!(ledger.stage2_recalls("03B1").unwrap(), 0);
        assert_eq!(ledger.increment_stage2_recalls("03B1").unwrap(), 1);
        assert_eq!(ledger.increment_stage2_recalls("03B1").unwrap(), 2);
        assert!(ledger.is_completed("03B1").unwrap());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.db");
        {
            let ledger = SqliteLedger::new(&path).unwrap();
            ledger.set_completed("222B").unwrap();
            ledger.increment_stage2_recalls("222B").unwrap();
        }
        let ledger = SqliteLedger::new(&path).unwrap();
        assert!(ledger.is_completed("222B").unwrap());
        assert_eq!(ledger.stage2_recalls("222B").unwrap(), 1);

        ledger.reset().unwrap();
        assert!(!ledger.is_completed("222B").unwrap());
    }
}
