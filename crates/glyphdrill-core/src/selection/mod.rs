//! Hidden-batch selection.
//!
//! Picks which rows of a recall round are masked. Rows whose symbol has
//! been confirmed visibly often enough are ranked by
//!
//! ```text
//! score = ±theta + uncertainty_weight * uncertainty + recency_weight * recency
//! ```
//!
//! where `theta` is the posterior mean (negated in weak mode so the least
//! reliable symbols come first). If too few rows qualify, the batch is
//! backfilled from the rest.

use crate::config::SchedulerTuning;
use crate::stats::ItemStatsTracker;
use crate::types::SelectionMode;
use ordered_float::OrderedFloat;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashSet;

/// Scoring weights and the visibility floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionWeights {
    pub min_visible_successes: u32,
    pub uncertainty_weight: f64,
    pub recency_weight: f64,
    pub recency_horizon: u32,
}

impl SelectionWeights {
    pub fn from_tuning(tuning: &SchedulerTuning) -> Self {
        Self {
            min_visible_successes: tuning.min_visible_successes,
            uncertainty_weight: tuning.uncertainty_weight,
            recency_weight: tuning.recency_weight,
            recency_horizon: tuning.recency_horizon,
        }
    }
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self::from_tuning(&SchedulerTuning::default())
    }
}

/// What the selector needs to know about the current round.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Row index to symbol code.
    pub row_codes: &'a [&'a str],
    pub stats: &'a ItemStatsTracker,
    /// Displayed round number, for recency.
    pub round: u32,
}

/// Scores and selects the rows to mask in a recall round.
#[derive(Debug, Clone, Copy)]
pub struct HiddenBatchSelector {
    weights: SelectionWeights,
    mode: SelectionMode,
}

impl HiddenBatchSelector {
    pub fn new(mode: SelectionMode) -> Self {
        Self::with_weights(SelectionWeights::default(), mode)
    }

    pub fn with_weights(weights: SelectionWeights, mode: SelectionMode) -> Self {
        Self { weights, mode }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Score a row's symbol. `None` if it has too few visible successes.
    pub fn score(&self, code: &str, ctx: &SelectionContext<'_>) -> Option<f64> {
        let stat = ctx.stats.get(code)?;
        if stat.visible_successes < self.weights.min_visible_successes {
            return None;
        }
        let theta = stat.posterior_mean();
        let recency = stat.recency(ctx.round, self.weights.recency_horizon);
        Some(
            self.mode.theta_sign() * theta
                + self.weights.uncertainty_weight * stat.uncertainty()
                + self.weights.recency_weight * recency,
        )
    }

    /// Select up to `planned_size` rows from `eligible_rows`.
    ///
    /// Returns exactly `min(planned_size, distinct eligible rows)` row
    /// indices, without duplicates. Rows out of range of
    /// `ctx.row_codes` are ignored.
    pub fn select_batch<R: Rng + ?Sized>(
        &self,
        eligible_rows: &[usize],
        planned_size: usize,
        ctx: &SelectionContext<'_>,
        rng: &mut R,
    ) -> Vec<usize> {
        let mut seen = HashSet::with_capacity(eligible_rows.len());
        let eligible: Vec<usize> = eligible_rows
            .iter()
            .copied()
            .filter(|&r| r < ctx.row_codes.len() && seen.insert(r))
            .collect();
        let target = planned_size.min(eligible.len());
        if target == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = Vec::new();
        let mut unqualified: Vec<usize> = Vec::new();
        for &row in &eligible {
            match self.score(ctx.row_codes[row], ctx) {
                Some(score) => scored.push((row, score)),
                None => unqualified.push(row),
            }
        }

        // Stable sort keeps eligible order among equal scores.
        scored.sort_by_key(|&(_, score)| Reverse(OrderedFloat(score)));
        let mut chosen: Vec<usize> = scored.iter().take(target).map(|&(r, _)| r).collect();

        if chosen.len() < target {
            let mut backfill: Vec<(u32, i64, u64, usize)> = unqualified
                .into_iter()
                .map(|row| {
                    let stat = ctx.stats.get(ctx.row_codes[row]);
                    let hidden = stat.map_or(0, |s| s.hidden_successes);
                    let last = stat
                        .and_then(|s| s.last_hidden_round)
                        .map_or(i64::MIN, i64::from);
                    (hidden, last, rng.gen::<u64>(), row)
                })
                .collect();
            backfill.sort_unstable();
            let missing = target - chosen.len();
            chosen.extend(backfill.into_iter().take(missing).map(|(.., row)| row));
        }

        tracing::debug!(
            eligible = eligible.len(),
            planned = planned_size,
            selected = chosen.len(),
            qualified = scored.len(),
            mode = %self.mode,
            round = ctx.round,
            "Selected hidden batch"
        );
        chosen
    }
}
