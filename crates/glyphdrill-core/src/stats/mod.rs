//! Per-symbol recall statistics.
//!
//! Each symbol carries a Beta(alpha, beta) posterior over "recalls the code
//! without seeing it", plus plain counters used by batch selection and the
//! promotion quota. Entries are created lazily and never removed, so a
//! symbol toggled off and back on keeps its history.

use crate::config::SchedulerTuning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics for one symbol code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStat {
    /// Hidden successes plus the uniform prior. Always >= 1.
    pub alpha: f64,
    /// Hidden failures plus the uniform prior. Always >= 1.
    pub beta: f64,
    pub visible_successes: u32,
    pub hidden_successes: u32,
    pub masked_failures: u32,
    /// Displayed round of the most recent hidden test, if any.
    pub last_hidden_round: Option<u32>,
}

impl ItemStat {
    /// Uniform Beta(1, 1) prior with zeroed counters.
    pub fn new() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            visible_successes: 0,
            hidden_successes: 0,
            masked_failures: 0,
            last_hidden_round: None,
        }
    }

    /// `alpha / (alpha + beta)`.
    pub fn posterior_mean(&self) -> f64 {
        let (a, b) = self.clamped();
        a / (a + b)
    }

    /// `1 / (alpha + beta)`; shrinks as evidence accumulates.
    pub fn uncertainty(&self) -> f64 {
        let (a, b) = self.clamped();
        1.0 / (a + b)
    }

    /// Spacing pressure in `[0, 1]`: rounds since the last hidden test over
    /// `horizon`, saturating at 1. Never-tested symbols get 1.
    pub fn recency(&self, round: u32, horizon: u32) -> f64 {
        match self.last_hidden_round {
            None => 1.0,
            Some(last) => {
                let gap = round.saturating_sub(last) as f64;
                (gap / horizon.max(1) as f64).min(1.0)
            }
        }
    }

    fn clamped(&self) -> (f64, f64) {
        (self.alpha.max(1.0), self.beta.max(1.0))
    }
}

impl Default for ItemStat {
    fn default() -> Self {
        Self::new()
    }
}

/// Hidden-success requirement for leaving Stage 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionQuota {
    /// Masked failures at which a symbol moves to the remedial path.
    pub remedial_failure_threshold: u32,
    pub remedial_hidden_successes: u32,
    pub standard_hidden_successes: u32,
}

impl PromotionQuota {
    pub fn from_tuning(tuning: &SchedulerTuning) -> Self {
        Self {
            remedial_failure_threshold: tuning.remedial_failure_threshold,
            remedial_hidden_successes: tuning.remedial_hidden_successes,
            standard_hidden_successes: tuning.standard_hidden_successes,
        }
    }

    /// Hidden successes a symbol with this history still needs in total.
    pub fn required_for(&self, stat: &ItemStat) -> u32 {
        if stat.masked_failures >= self.remedial_failure_threshold {
            self.remedial_hidden_successes
        } else {
            self.standard_hidden_successes
        }
    }

    pub fn is_met(&self, stat: &ItemStat) -> bool {
        stat.hidden_successes >= self.required_for(stat)
    }
}

impl Default for PromotionQuota {
    fn default() -> Self {
        Self::from_tuning(&SchedulerTuning::default())
    }
}

/// Mapping from symbol code to [`ItemStat`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStatsTracker {
    stats: BTreeMap<String, ItemStat>,
}

impl ItemStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a default entry if absent. Idempotent.
    pub fn ensure(&mut self, code: &str) -> &mut ItemStat {
        self.stats.entry(code.to_string()).or_default()
    }

    pub fn get(&self, code: &str) -> Option<&ItemStat> {
        self.stats.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.stats.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemStat)> + '_ {
        self.stats.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn record_visible_success(&mut self, code: &str) {
        let stat = self.ensure(code);
        stat.visible_successes += 1;
        tracing::trace!(code, visible = stat.visible_successes, "Visible success");
    }

    pub fn record_hidden_success(&mut self, code: &str, round: u32) {
        let stat = self.ensure(code);
        stat.alpha += 1.0;
        stat.hidden_successes += 1;
        stat.last_hidden_round = Some(round);
        tracing::debug!(code, round, alpha = stat.alpha, "Hidden success");
    }

    pub fn record_hidden_failure(&mut self, code: &str, round: u32) {
        let stat = self.ensure(code);
        stat.beta += 1.0;
        stat.last_hidden_round = Some(round);
        stat.masked_failures += 1;
        tracing::debug!(
            code,
            round,
            beta = stat.beta,
            masked_failures = stat.masked_failures,
            "Hidden failure"
        );
    }

    /// Posterior mean; the uniform prior's 0.5 for unseen codes.
    pub fn posterior_mean(&self, code: &str) -> f64 {
        self.get(code)
            .map(ItemStat::posterior_mean)
            .unwrap_or_else(|| ItemStat::new().posterior_mean())
    }

    /// Posterior uncertainty; 0.5 for unseen codes.
    pub fn posterior_uncertainty(&self, code: &str) -> f64 {
        self.get(code)
            .map(ItemStat::uncertainty)
            .unwrap_or_else(|| ItemStat::new().uncertainty())
    }

    /// Whether a code has met the promotion quota.
    pub fn meets_quota(&self, code: &str, quota: &PromotionQuota) -> bool {
        self.get(code).is_some_and(|s| quota.is_met(s))
    }

    /// Whether every code in `codes` has met the quota.
    pub fn all_meet_quota<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a str>,
        quota: &PromotionQuota,
    ) -> bool {
        codes.into_iter().all(|c| self.meets_quota(c, quota))
    }
}
