//! Planned-round counter for progress display.

use serde::Serialize;
use strum::Display;

/// Extra recall rounds reserved for growing the row set.
const EXPANSION_ALLOWANCE: u32 = 2;

/// Why a round boundary is being crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AdvanceReason {
    /// The learner finished the round.
    Natural,
    /// The round was completed synthetically; it must not extend the count.
    UserSkip,
}

/// Monotonic estimate of the total Stage 1 rounds.
///
/// Only ever increases. A repeat pass extends it by one unless the
/// transition was a user skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundCounter {
    total: u32,
    vetoed: u32,
}

impl RoundCounter {
    /// Baseline for a pool of `pool_len` symbols.
    ///
    /// `passes + max(0, n - rows) + min(max(0, n - rows), 2)` where `rows`
    /// is the practice seed size.
    pub fn baseline(pool_len: usize, practice_rows: usize, practice_passes: u32) -> u32 {
        if pool_len == 0 {
            return 0;
        }
        let growth = pool_len.saturating_sub(practice_rows) as u32;
        practice_passes + growth + growth.min(EXPANSION_ALLOWANCE)
    }

    pub fn new(initial: u32) -> Self {
        Self {
            total: initial,
            vetoed: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Extensions blocked by user skips so far.
    pub fn vetoed(&self) -> u32 {
        self.vetoed
    }

    /// Total to display while on `display_round`.
    pub fn displayed(&self, display_round: u32) -> u32 {
        self.total.max(display_round)
    }

    /// Raise to at least `value` without notifying. Returns whether it grew.
    pub fn raise_to(&mut self, value: u32) -> bool {
        if value > self.total {
            self.total = value;
            true
        } else {
            false
        }
    }

    /// Extend by `delta`. Returns whether the caller should announce it.
    pub fn extend(&mut self, delta: u32, reason: AdvanceReason) -> bool {
        match reason {
            AdvanceReason::UserSkip => {
                self.vetoed += 1;
                tracing::debug!(total = self.total, "Round extension suppressed by skip");
                false
            }
            AdvanceReason::Natural if delta > 0 => {
                self.total += delta;
                true
            }
            AdvanceReason::Natural => false,
        }
    }
}

impl Default for RoundCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline() {
        assert_eq!(RoundCounter::baseline(3, 3, 2), 2);
        assert_eq!(RoundCounter::baseline(4, 3, 2), 4);
        assert_eq!(RoundCounter::baseline(7, 3, 2), 8);
        assert_eq!(RoundCounter::baseline(21, 3, 2), 22);
        assert_eq!(RoundCounter::baseline(0, 3, 2), 0);
    }

    #[test]
    fn test_extend_natural() {
        let mut counter = RoundCounter::new(4);
        assert!(counter.extend(1, AdvanceReason::Natural));
        assert_eq!(counter.total(), 5);
        assert!(!counter.extend(0, AdvanceReason::Natural));
    }

    #[test]
    fn test_user_skip_blocks_exactly_one() {
        let mut counter = RoundCounter::new(4);
        assert!(!counter.extend(1, AdvanceReason::UserSkip));
        assert_eq!(counter.total(), 4);
        assert_eq!(counter.vetoed(), 1);
        assert!(counter.extend(1, AdvanceReason::Natural));
        assert_eq!(counter.total(), 5);
    }

    #[test]
    fn test_never_decreases() {
        let mut counter = RoundCounter::new(8);
        assert!(!counter.raise_to(5));
        assert_eq!(counter.total(), 8);
        assert!(counter.raise_to(9));
        assert_eq!(counter.displayed(3), 9);
        assert_eq!(counter.displayed(12), 12);
    }
}
