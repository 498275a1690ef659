//! Cross-session progress ledger.
//!
//! Keyed by symbol code and separate from [`ItemStat`](crate::stats::ItemStat):
//! it records whether a symbol finished practice and how many Stage 2
//! recalls it has, and it outlives a single session.

mod sqlite;

pub use sqlite::SqliteLedger;

use crate::error::GlyphResult;
use std::collections::HashMap;
use std::sync::Mutex;

/// Trait for progress ledger storage.
pub trait ProgressLedger: Send + Sync {
    /// Whether the symbol has ever completed a practice row.
    fn is_completed(&self, code: &str) -> GlyphResult<bool>;

    /// Mark the symbol completed.
    fn set_completed(&self, code: &str) -> GlyphResult<()>;

    /// Correct Stage 2 recalls recorded for the symbol.
    fn stage2_recalls(&self, code: &str) -> GlyphResult<u32>;

    /// Record one more correct Stage 2 recall; returns the new count.
    fn increment_stage2_recalls(&self, code: &str) -> GlyphResult<u32>;

    /// Forget everything.
    fn reset(&self) -> GlyphResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    completed: bool,
    recalls: u32,
}

/// Mutex-guarded in-memory ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<HashMap<String, Progress>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressLedger for InMemoryLedger {
    fn is_completed(&self, code: &str) -> GlyphResult<bool> {
        Ok(self.entries.lock()?.get(code).is_some_and(|p| p.completed))
    }

    fn set_completed(&self, code: &str) -> GlyphResult<()> {
        self.entries.lock()?.entry(code.to_string()).or_default().completed = true;
        Ok(())
    }

    fn stage2_recalls(&self, code: &str) -> GlyphResult<u32> {
        Ok(self.entries.lock()?.get(code).map_or(0, |p| p.recalls))
    }

    fn increment_stage2_recalls(&self, code: &str) -> GlyphResult<u32> {
        let mut entries = self.entries.lock()?;
        let progress = entries.entry(code.to_string()).or_default();
        progress.recalls += 1;
        Ok(progress.recalls)
    }

    fn reset(&self) -> GlyphResult<()> {
        self.entries.lock()?.clear();
        Ok(())
    }
}
