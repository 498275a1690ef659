//! Promotion from Stage 1 into the Stage 2 drill.

use super::drill::Stage2Session;
use crate::config::TrainerConfig;
use crate::error::GlyphResult;
use crate::ledger::ProgressLedger;
use crate::stats::{ItemStatsTracker, PromotionQuota};
use crate::working_set::WorkingSet;
use rand::rngs::StdRng;

/// Correct recalls each symbol needs before Stage 2 is complete.
pub const REQUIRED_RECALLS: u32 = 2;

/// Gate and constructor for the Stage 2 hand-off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stage2Handoff;

impl Stage2Handoff {
    /// Whether every code in the pool has met its hidden-success quota.
    pub fn is_ready<'a>(
        stats: &ItemStatsTracker,
        codes: impl IntoIterator<Item = &'a str>,
        quota: &PromotionQuota,
    ) -> bool {
        let mut any = false;
        let all = codes.into_iter().all(|code| {
            any = true;
            stats.meets_quota(code, quota)
        });
        any && all
    }

    /// Build the drill over the whole working set.
    ///
    /// Recall counts come from the ledger, so progress made in an earlier
    /// Stage 2 pass is neither lost nor invented.
    pub fn promote(
        working_set: &WorkingSet,
        ledger: &dyn ProgressLedger,
        config: &TrainerConfig,
        modifier_held: bool,
        rng: StdRng,
    ) -> GlyphResult<Stage2Session> {
        let session = Stage2Session::new(
            working_set,
            ledger,
            config.pacing.clone(),
            config.preferences.order_mode,
            modifier_held,
            rng,
        )?;
        tracing::info!(
            pool = working_set.len(),
            completed = session.rounds_completed(),
            total = session.total_rounds(),
            "Promoted to Stage 2"
        );
        Ok(session)
    }
}
