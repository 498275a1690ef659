//! Round state and the views derived from it.

use crate::catalog::Symbol;
use serde::Serialize;
use std::collections::BTreeSet;
use strum::Display;

/// Stage 1 phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Practice,
    /// Reported as soon as the last practice pass ends, while the practice
    /// rows and the start-recall interrupt are still on screen. The first
    /// recall round is built when that interrupt finishes.
    Recall,
    /// Terminal: the session has handed over to Stage 2.
    Promoted,
}

/// What a row must be typed for this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Code visible, typed once during practice.
    Practice,
    /// Code masked, typed from memory.
    Hidden,
    /// Code visible, typed once for reinforcement.
    Visible,
}

/// Input gate. Keys are only accepted while `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Idle,
    /// A row was just completed; waiting before moving on.
    AwaitingRowAdvance,
    /// The pattern interrupt is playing.
    AwaitingInterrupt,
}

/// The row currently being typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveTask {
    pub row: usize,
    pub kind: TaskKind,
}

/// One row as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub symbol: Symbol,
    /// Code hidden behind `????`.
    pub is_masked: bool,
    /// Characters typed so far on this row.
    pub cursor: usize,
    pub completed: bool,
    /// This round's task for the row, if it has one.
    pub task: Option<TaskKind>,
}

impl RowView {
    /// Code as displayed: typed prefix plus `?` for a masked row.
    pub fn code_display(&self) -> String {
        if !self.is_masked {
            return self.symbol.code.to_string();
        }
        self.symbol
            .code
            .chars()
            .enumerate()
            .map(|(i, c)| if i < self.cursor { c } else { '?' })
            .collect()
    }
}

/// Snapshot of a Stage 1 round, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundView {
    pub phase: Phase,
    pub display_round: u32,
    pub total_rounds: u32,
    pub rows: Vec<RowView>,
    pub highlight_row: Option<usize>,
    pub transition: Transition,
}

/// Mutable state of the live round.
///
/// Rows hold the symbols themselves, so a rebuilt working set never
/// leaves stale indices behind.
#[derive(Debug, Clone, Default)]
pub(crate) struct RoundState {
    pub rows: Vec<Symbol>,
    pub completed: Vec<bool>,
    pub eligible: Vec<usize>,
    pub hidden_planned: Vec<usize>,
    pub visible_required: Vec<usize>,
    pub active: Option<ActiveTask>,
    pub cursor: usize,
    pub free_hidden_used: u32,
    pub free_visible_used: u32,
    pub repeat_pass: u32,
    /// Codes first shown this round; never eligible for masking in it.
    pub newly_introduced: BTreeSet<String>,
}

impl RoundState {
    pub fn with_rows(rows: Vec<Symbol>) -> Self {
        let completed = vec![false; rows.len()];
        Self {
            rows,
            completed,
            repeat_pass: 1,
            ..Default::default()
        }
    }

    /// Clear per-round progress, keeping rows and the newly-introduced set.
    pub fn reset_progress(&mut self) {
        self.completed = vec![false; self.rows.len()];
        self.eligible.clear();
        self.hidden_planned.clear();
        self.visible_required.clear();
        self.active = None;
        self.cursor = 0;
        self.free_hidden_used = 0;
        self.free_visible_used = 0;
    }

    pub fn all_completed(&self) -> bool {
        self.completed.iter().all(|&c| c)
    }

    pub fn is_completed(&self, row: usize) -> bool {
        self.completed.get(row).copied().unwrap_or(false)
    }

    pub fn pending_hidden(&self) -> Vec<usize> {
        self.hidden_planned
            .iter()
            .copied()
            .filter(|&r| !self.is_completed(r))
            .collect()
    }

    pub fn pending_visible(&self) -> Vec<usize> {
        self.visible_required
            .iter()
            .copied()
            .filter(|&r| !self.is_completed(r))
            .collect()
    }

    pub fn task_for(&self, row: usize) -> Option<TaskKind> {
        if self.hidden_planned.contains(&row) {
            Some(TaskKind::Hidden)
        } else if self.visible_required.contains(&row) {
            Some(TaskKind::Visible)
        } else {
            None
        }
    }

    pub fn code_at(&self, row: usize) -> Option<&'static str> {
        self.rows.get(row).map(|s| s.code)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.rows.iter().map(|s| s.code).collect()
    }

    pub fn row_of(&self, code: &str) -> Option<usize> {
        self.rows.iter().position(|s| s.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RoundState {
        let mut state = RoundState::with_rows(vec![
            Symbol::new("α", "Alpha", "03B1"),
            Symbol::new("β", "Beta", "03B2"),
            Symbol::new("γ", "Gamma", "03B3"),
        ]);
        state.hidden_planned = vec![2];
        state.visible_required = vec![0, 1];
        state
    }

    #[test]
    fn test_pending_lists_skip_completed() {
        let mut state = state();
        state.completed[0] = true;
        assert_eq!(state.pending_hidden(), vec![2]);
        assert_eq!(state.pending_visible(), vec![1]);
        state.completed[2] = true;
        assert!(state.pending_hidden().is_empty());
    }

    #[test]
    fn test_reset_progress_keeps_rows() {
        let mut state = state();
        state.completed = vec![true; 3];
        state.free_hidden_used = 1;
        state.newly_introduced.insert("03B3".into());
        state.reset_progress();
        assert_eq!(state.rows.len(), 3);
        assert!(!state.all_completed());
        assert!(state.hidden_planned.is_empty());
        assert_eq!(state.free_hidden_used, 0);
        assert!(state.newly_introduced.contains("03B3"));
        assert_eq!(state.row_of("03B2"), Some(1));
        assert_eq!(state.codes(), vec!["03B1", "03B2", "03B3"]);
    }

    #[test]
    fn test_masked_code_display() {
        let row = RowView {
            symbol: Symbol::new("α", "Alpha", "03B1"),
            is_masked: true,
            cursor: 2,
            completed: false,
            task: Some(TaskKind::Hidden),
        };
        assert_eq!(row.code_display(), "03??");

        let visible = RowView { is_masked: false, ..row };
        assert_eq!(visible.code_display(), "03B1");
    }
}
