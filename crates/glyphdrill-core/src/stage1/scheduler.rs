//! Stage 1 state machine.
//!
//! Practice runs a fixed number of passes over the first few pool symbols
//! with codes visible. Recall rounds then grow the row set by one symbol per
//! round, mask a planned batch of previously seen rows and require every
//! other row to be typed once visibly. Each recall round is played twice
//! (the second pass reshuffled) before the promotion quota is checked.
//!
//! All delays are continuations on an owned [`Timeline`]; the caller drives
//! the clock with [`Stage1Scheduler::advance_to`].

use super::counter::{AdvanceReason, RoundCounter};
use super::round::{ActiveTask, Phase, RoundState, RoundView, RowView, TaskKind, Transition};
use crate::catalog::Symbol;
use crate::config::{PacingConfig, SchedulerTuning, TrainerConfig};
use crate::error::{GlyphError, GlyphResult};
use crate::feedback::Hooks;
use crate::selection::{HiddenBatchSelector, SelectionContext, SelectionWeights};
use crate::stage2::Stage2Handoff;
use crate::stats::{ItemStatsTracker, PromotionQuota};
use crate::timeline::{Timeline, Token};
use crate::types::{KeyEvent, OrderMode};
use crate::working_set::WorkingSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Passes per recall round: the round itself plus one reshuffled repeat.
const RECALL_PASSES: u32 = 2;

/// Consecutive skipped interrupts that trigger a challenge.
const CHALLENGE_STREAK: u32 = 3;

/// What runs once the pattern interrupt finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AfterInterrupt {
    RepeatPractice,
    StartRecall,
    RepeatRecall,
    NextRecall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Continuation {
    AdvanceRow,
    InterruptDone(AfterInterrupt),
    ChallengeMask(&'static str),
}

#[derive(Debug, Clone, Copy, Default)]
struct InterruptCycle {
    skipped: bool,
    streak: u32,
}

/// Counts for a progress footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage1Progress {
    pub phase: Phase,
    pub display_round: u32,
    pub total_rounds: u32,
    /// Distinct symbols shown so far.
    pub exposed: usize,
    pub pool_size: usize,
    pub hidden_planned: usize,
    pub hidden_done: usize,
    pub visible_required: usize,
    pub visible_done: usize,
}

/// The live Stage 1 session.
#[derive(Debug)]
pub struct Stage1Scheduler {
    pub(super) tuning: SchedulerTuning,
    pacing: PacingConfig,
    pub(super) order: OrderMode,
    selector: HiddenBatchSelector,
    quota: PromotionQuota,
    pub(super) show_all: bool,
    pub(super) show_new_immediately: bool,
    debug: bool,
    pub(super) working_set: WorkingSet,
    /// Working set in introduction order (shuffled in random mode).
    pub(super) pool: Vec<Symbol>,
    stats: ItemStatsTracker,
    pub(super) phase: Phase,
    pub(super) round: RoundState,
    practice_passes_done: u32,
    recall_rounds_completed: u32,
    display_round: u32,
    pub(super) seen: BTreeSet<String>,
    counter: RoundCounter,
    /// A skip happened; the next real extension is vetoed.
    veto_pending: bool,
    pub(super) transition: Transition,
    modifier_held: bool,
    /// Rows saved when "show all" was switched on.
    pub(super) override_snapshot: Option<Vec<Symbol>>,
    pending: Option<Token>,
    challenge: Option<Token>,
    cycle: InterruptCycle,
    timeline: Timeline<Continuation>,
    rng: StdRng,
}

impl Stage1Scheduler {
    /// Create a scheduler positioned at the first practice row.
    pub fn new(config: &TrainerConfig, working_set: WorkingSet, rng: StdRng) -> GlyphResult<Self> {
        let tuning = config.tuning.clone();
        if working_set.len() < tuning.min_working_set {
            return Err(GlyphError::set_too_small(working_set.len(), tuning.min_working_set));
        }
        let prefs = &config.preferences;
        let mut scheduler = Self {
            pacing: config.pacing.clone(),
            order: prefs.order_mode,
            selector: HiddenBatchSelector::with_weights(
                SelectionWeights::from_tuning(&tuning),
                prefs.selection_mode,
            ),
            quota: PromotionQuota::from_tuning(&tuning),
            show_all: false,
            show_new_immediately: prefs.show_new_immediately,
            debug: prefs.debug,
            working_set: WorkingSet::default(),
            pool: Vec::new(),
            stats: ItemStatsTracker::new(),
            phase: Phase::Practice,
            round: RoundState::default(),
            practice_passes_done: 0,
            recall_rounds_completed: 0,
            display_round: 1,
            seen: BTreeSet::new(),
            counter: RoundCounter::default(),
            veto_pending: false,
            transition: Transition::Idle,
            modifier_held: false,
            override_snapshot: None,
            pending: None,
            challenge: None,
            cycle: InterruptCycle::default(),
            timeline: Timeline::new(),
            rng,
            tuning,
        };
        scheduler.rebuild_pool(working_set);
        scheduler.init_practice();
        Ok(scheduler)
    }

    /// Draw the first practice table.
    pub fn start(&mut self, hooks: &mut Hooks<'_>) {
        tracing::info!(
            pool = self.pool.len(),
            total_rounds = self.total_rounds(),
            order = %self.order,
            "Stage 1 started"
        );
        self.render(hooks);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_promoted(&self) -> bool {
        self.phase == Phase::Promoted
    }

    /// Whether a task is highlighted and input is open.
    ///
    /// False while a row advance or interrupt is pending, so a caller can
    /// drain the timeline until the round on screen matches [`phase`](Self::phase).
    pub fn is_settled(&self) -> bool {
        self.transition == Transition::Idle && self.round.active.is_some()
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn display_round(&self) -> u32 {
        self.display_round
    }

    /// Planned total rounds as displayed.
    pub fn total_rounds(&self) -> u32 {
        self.counter.displayed(self.display_round)
    }

    /// Round extensions blocked by user skips.
    pub fn vetoed_extensions(&self) -> u32 {
        self.counter.vetoed()
    }

    /// Whether a skip is still waiting to veto the next extension.
    pub fn extension_veto_pending(&self) -> bool {
        self.veto_pending
    }

    pub fn practice_passes_done(&self) -> u32 {
        self.practice_passes_done
    }

    pub fn recall_rounds_completed(&self) -> u32 {
        self.recall_rounds_completed
    }

    pub fn stats(&self) -> &ItemStatsTracker {
        &self.stats
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn seen_codes(&self) -> &BTreeSet<String> {
        &self.seen
    }

    pub fn hidden_rows(&self) -> &[usize] {
        &self.round.hidden_planned
    }

    pub fn visible_rows(&self) -> &[usize] {
        &self.round.visible_required
    }

    pub fn modifier_held(&self) -> bool {
        self.modifier_held
    }

    pub fn skip_streak(&self) -> u32 {
        self.cycle.streak
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn show_new_immediately(&self) -> bool {
        self.show_new_immediately
    }

    pub fn set_show_new_immediately(&mut self, show: bool) {
        self.show_new_immediately = show;
    }

    /// When the next continuation is due, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.timeline.next_due()
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Current table, derived from state.
    pub fn view(&self) -> RoundView {
        let active = self.round.active;
        let rows = self
            .round
            .rows
            .iter()
            .enumerate()
            .map(|(i, symbol)| {
                let completed = self.round.is_completed(i);
                let task = match self.phase {
                    Phase::Practice => Some(TaskKind::Practice),
                    _ => self.round.task_for(i),
                };
                let is_active = active.is_some_and(|t| t.row == i);
                RowView {
                    symbol: *symbol,
                    is_masked: self.phase == Phase::Recall
                        && task == Some(TaskKind::Hidden)
                        && !completed,
                    cursor: if is_active { self.round.cursor } else { 0 },
                    completed,
                    task,
                }
            })
            .collect();

        RoundView {
            phase: self.phase,
            display_round: self.display_round,
            total_rounds: self.total_rounds(),
            rows,
            highlight_row: active.map(|t| t.row),
            transition: self.transition,
        }
    }

    pub fn progress(&self) -> Stage1Progress {
        let done = |rows: &[usize]| rows.iter().filter(|&&r| self.round.is_completed(r)).count();
        Stage1Progress {
            phase: self.phase,
            display_round: self.display_round,
            total_rounds: self.total_rounds(),
            exposed: self.seen.len(),
            pool_size: self.pool.len(),
            hidden_planned: self.round.hidden_planned.len(),
            hidden_done: done(&self.round.hidden_planned),
            visible_required: self.round.visible_required.len(),
            visible_done: done(&self.round.visible_required),
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Feed one key event.
    ///
    /// Hex digits only count while the modifier is held and no transition
    /// is pending. Releasing the modifier mid-entry counts as a wrong key.
    pub fn handle_key(&mut self, now: Duration, key: KeyEvent, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        self.ensure_live()?;
        match key {
            KeyEvent::ModifierDown => {
                self.modifier_held = true;
            }
            KeyEvent::ModifierUp => {
                self.modifier_held = false;
                if self.transition == Transition::Idle && self.round.cursor > 0 {
                    if let Some(task) = self.round.active {
                        self.wrong_key(task, hooks);
                        self.render(hooks);
                    }
                }
            }
            KeyEvent::Other => {}
            KeyEvent::Hex(digit) => {
                if !self.modifier_held || self.transition != Transition::Idle {
                    return Ok(());
                }
                let Some(task) = self.round.active else {
                    return Ok(());
                };
                let Some(code) = self.round.code_at(task.row) else {
                    return Ok(());
                };

                if code.chars().nth(self.round.cursor) == Some(digit.as_char()) {
                    self.round.cursor += 1;
                    hooks.feedback.on_correct_char(self.round.cursor - 1);
                    if self.round.cursor >= code.len() {
                        self.complete_task(now, task, code, hooks)?;
                    }
                } else {
                    self.wrong_key(task, hooks);
                }
                self.render(hooks);
            }
        }
        Ok(())
    }

    /// Fire every continuation due at or before `now`.
    ///
    /// Each continuation runs at its own due time, so chained delays add up
    /// exactly regardless of how far the clock jumps.
    pub fn advance_to(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        while let Some(due) = self.timeline.next_due().filter(|d| *d <= now) {
            let Some((token, continuation)) = self.timeline.pop_due(due) else {
                break;
            };
            self.fire(due, token, continuation, hooks)?;
        }
        Ok(())
    }

    /// Hurry the pattern interrupt: halve what is left, down to the floor.
    ///
    /// Returns false when no interrupt is playing.
    pub fn skip_interrupt(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> bool {
        if self.transition != Transition::AwaitingInterrupt {
            return false;
        }
        let Some(token) = self.pending else {
            return false;
        };
        let Some(remaining) = self.timeline.remaining(token, now) else {
            return false;
        };

        let halved = Duration::from_millis((remaining.as_millis() as u64).div_ceil(2));
        let remaining = halved.max(self.pacing.interrupt_floor());
        self.timeline.reschedule(token, now, remaining);
        self.cycle.skipped = true;
        hooks.interrupt.accelerate(remaining);
        tracing::debug!(remaining_ms = remaining.as_millis() as u64, "Interrupt skipped");
        true
    }

    /// Treat the current round as perfect and hand over to Stage 2.
    pub fn skip_to_next_round(&mut self, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        self.ensure_live()?;
        self.cancel_pending(hooks);
        self.cycle = InterruptCycle::default();
        self.round.completed.iter_mut().for_each(|c| *c = true);
        self.round.active = None;
        self.round.cursor = 0;
        self.veto_pending = true;
        tracing::info!(round = self.display_round, "Round skipped by user");
        self.promote(hooks);
        Ok(())
    }

    /// Debug: finish the current round as if every task had been typed.
    pub fn force_complete_round(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        self.ensure_live()?;
        if !self.debug {
            return Err(GlyphError::not_allowed("Forcing a round requires debug mode"));
        }
        if self.transition == Transition::AwaitingInterrupt {
            tracing::debug!("Nothing to complete while the interrupt plays");
            return Ok(());
        }
        if let Some(token) = self.pending.take() {
            self.timeline.cancel(token);
        }
        self.transition = Transition::Idle;
        self.round.active = None;
        self.round.cursor = 0;

        match self.phase {
            Phase::Practice => {
                self.phase = Phase::Recall;
                self.recall_rounds_completed = 0;
                self.begin_interrupt(now, AfterInterrupt::StartRecall, hooks);
                Ok(())
            }
            Phase::Recall => {
                for row in 0..self.round.rows.len() {
                    if self.round.is_completed(row) {
                        continue;
                    }
                    let code = self.round.rows[row].code;
                    match self.round.task_for(row) {
                        Some(TaskKind::Hidden) => {
                            self.stats.record_hidden_success(code, self.display_round)
                        }
                        _ => self.stats.record_visible_success(code),
                    }
                    self.round.completed[row] = true;
                }
                self.veto_pending = true;
                self.finish_recall_round(now, hooks);
                Ok(())
            }
            Phase::Promoted => Ok(()),
        }
    }

    // ========================================================================
    // Round construction
    // ========================================================================

    /// Replace the working set; stats for every symbol are kept or created.
    pub(super) fn rebuild_pool(&mut self, working_set: WorkingSet) {
        let mut pool = working_set.symbols().to_vec();
        if self.order.is_random() {
            pool.shuffle(&mut self.rng);
        }
        for symbol in &pool {
            self.stats.ensure(symbol.code);
        }
        let baseline = RoundCounter::baseline(
            pool.len(),
            self.tuning.practice_rows,
            self.tuning.practice_passes,
        );
        self.counter.raise_to(baseline);
        self.pool = pool;
        self.working_set = working_set;
    }

    fn init_practice(&mut self) {
        self.phase = Phase::Practice;
        self.practice_passes_done = 0;
        self.recall_rounds_completed = 0;
        self.display_round = 1;
        self.override_snapshot = None;

        let take = self.tuning.practice_rows.min(self.pool.len());
        let mut rows = self.pool[..take].to_vec();
        rows.shuffle(&mut self.rng);
        self.seen = rows.iter().map(|s| s.code.to_string()).collect();
        self.round = RoundState::with_rows(rows);
        self.round.active = Some(ActiveTask {
            row: 0,
            kind: TaskKind::Practice,
        });
    }

    /// Throw away all round state and start practice again.
    ///
    /// Stats and the counter survive.
    pub(super) fn reset_practice(&mut self, hooks: &mut Hooks<'_>) {
        self.cancel_pending(hooks);
        self.init_practice();
        self.render(hooks);
    }

    fn repeat_practice(&mut self, hooks: &mut Hooks<'_>) {
        self.round.rows.shuffle(&mut self.rng);
        self.round.reset_progress();
        self.round.active = Some(ActiveTask {
            row: 0,
            kind: TaskKind::Practice,
        });
        tracing::info!(round = self.display_round, "Practice pass repeated");
        self.render(hooks);
    }

    fn advance_practice(&mut self, now: Duration, hooks: &mut Hooks<'_>) {
        let next = (0..self.round.rows.len()).find(|&r| !self.round.is_completed(r));
        if let Some(row) = next {
            self.round.active = Some(ActiveTask {
                row,
                kind: TaskKind::Practice,
            });
            self.round.cursor = 0;
            self.render(hooks);
            return;
        }

        self.practice_passes_done += 1;
        if self.practice_passes_done < self.tuning.practice_passes {
            self.begin_interrupt(now, AfterInterrupt::RepeatPractice, hooks);
        } else {
            self.phase = Phase::Recall;
            self.recall_rounds_completed = 0;
            tracing::info!(passes = self.practice_passes_done, "Practice complete");
            self.begin_interrupt(now, AfterInterrupt::StartRecall, hooks);
        }
    }

    fn start_recall_round(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        self.phase = Phase::Recall;
        self.override_snapshot = None;

        let target = (self.tuning.initial_recall_rows + self.recall_rounds_completed as usize)
            .min(self.pool.len());
        let mut base = std::mem::take(&mut self.round.rows);
        base.shuffle(&mut self.rng);
        if target > base.len() {
            let next = self
                .pool
                .iter()
                .find(|s| !base.iter().any(|b| b.code == s.code))
                .copied();
            if let Some(symbol) = next {
                base.push(symbol);
            }
        }
        let rows = if self.show_all { self.pool.clone() } else { base };

        let mut round = RoundState::with_rows(rows);
        for (i, symbol) in round.rows.iter().enumerate() {
            self.stats.ensure(symbol.code);
            if self.seen.contains(symbol.code) {
                round.eligible.push(i);
            } else {
                round.newly_introduced.insert(symbol.code.to_string());
            }
        }
        self.seen.extend(round.rows.iter().map(|s| s.code.to_string()));
        self.round = round;
        self.plan_round();

        tracing::info!(
            round = self.display_round,
            recall_round = self.recall_rounds_completed + 1,
            rows = self.round.rows.len(),
            hidden = self.round.hidden_planned.len(),
            new = self.round.newly_introduced.len(),
            "Recall round started"
        );
        self.next_task(now, hooks)
    }

    fn repeat_recall_round(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        let reason = if std::mem::take(&mut self.veto_pending) {
            AdvanceReason::UserSkip
        } else {
            AdvanceReason::Natural
        };
        if self.counter.extend(1, reason) {
            hooks.feedback.on_round_extended(self.total_rounds());
        }
        self.round.rows.shuffle(&mut self.rng);
        self.round.reset_progress();
        self.round.eligible = self
            .round
            .rows
            .iter()
            .enumerate()
            .filter(|(_, s)| !self.round.newly_introduced.contains(s.code))
            .map(|(i, _)| i)
            .collect();
        self.plan_round();

        tracing::info!(
            round = self.display_round,
            hidden = self.round.hidden_planned.len(),
            %reason,
            "Recall round repeated"
        );
        self.next_task(now, hooks)
    }

    fn planned_batch_size(&self) -> usize {
        let offset = self.display_round.saturating_sub(self.tuning.first_recall_round);
        ((offset / 2 + 1) as usize).min(self.round.eligible.len())
    }

    /// Split rows into the hidden batch and the visible remainder.
    fn plan_round(&mut self) {
        let planned = self.planned_batch_size();
        let codes = self.round.codes();
        let ctx = SelectionContext {
            row_codes: &codes,
            stats: &self.stats,
            round: self.display_round,
        };
        let hidden = self
            .selector
            .select_batch(&self.round.eligible, planned, &ctx, &mut self.rng);
        self.round.visible_required = (0..self.round.rows.len())
            .filter(|r| !hidden.contains(r))
            .collect();
        self.round.hidden_planned = hidden;
    }

    /// Lay out `rows` for the current recall round and restart driving.
    ///
    /// Rows already on screen keep their completion; the rest take it from
    /// the ledger. Eligibility follows the same rule as a fresh round.
    pub(super) fn apply_layout(
        &mut self,
        rows: Vec<Symbol>,
        now: Duration,
        hooks: &mut Hooks<'_>,
    ) -> GlyphResult<()> {
        let previous: HashMap<&str, bool> = self
            .round
            .rows
            .iter()
            .zip(&self.round.completed)
            .map(|(s, &c)| (s.code, c))
            .collect();

        let mut completed = Vec::with_capacity(rows.len());
        for symbol in &rows {
            let done = match previous.get(symbol.code) {
                Some(&done) => done,
                None => hooks.ledger.is_completed(symbol.code)?,
            };
            completed.push(done);
        }

        let mut eligible = Vec::new();
        for (i, symbol) in rows.iter().enumerate() {
            self.stats.ensure(symbol.code);
            if !self.seen.contains(symbol.code) {
                self.round.newly_introduced.insert(symbol.code.to_string());
            } else if !completed[i] && !self.round.newly_introduced.contains(symbol.code) {
                eligible.push(i);
            }
        }
        self.seen.extend(rows.iter().map(|s| s.code.to_string()));

        self.round.rows = rows;
        self.round.completed = completed;
        self.round.eligible = eligible;
        self.round.active = None;
        self.round.cursor = 0;
        self.plan_round();

        match self.transition {
            // The pending continuation builds the next round from these rows.
            Transition::AwaitingInterrupt => {
                self.render(hooks);
                Ok(())
            }
            Transition::AwaitingRowAdvance => {
                if let Some(token) = self.pending.take() {
                    self.timeline.cancel(token);
                }
                self.transition = Transition::Idle;
                self.next_task(now, hooks)
            }
            Transition::Idle => self.next_task(now, hooks),
        }
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Activate a random pending hidden row, else a visible one, else end
    /// the round.
    fn next_task(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        self.round.cursor = 0;
        let hidden = self.round.pending_hidden();
        if let Some(&row) = hidden.choose(&mut self.rng) {
            self.round.active = Some(ActiveTask {
                row,
                kind: TaskKind::Hidden,
            });
            self.render(hooks);
            return Ok(());
        }
        let visible = self.round.pending_visible();
        if let Some(&row) = visible.choose(&mut self.rng) {
            self.round.active = Some(ActiveTask {
                row,
                kind: TaskKind::Visible,
            });
            self.render(hooks);
            return Ok(());
        }

        self.round.active = None;
        self.finish_recall_round(now, hooks);
        Ok(())
    }

    fn finish_recall_round(&mut self, now: Duration, hooks: &mut Hooks<'_>) {
        if self.round.repeat_pass < RECALL_PASSES {
            self.round.repeat_pass += 1;
            self.begin_interrupt(now, AfterInterrupt::RepeatRecall, hooks);
            return;
        }

        self.recall_rounds_completed += 1;
        let ready = Stage2Handoff::is_ready(
            &self.stats,
            self.pool.iter().map(|s| s.code),
            &self.quota,
        );
        tracing::info!(
            recall_rounds = self.recall_rounds_completed,
            ready,
            "Recall round finished"
        );
        if ready {
            self.promote(hooks);
        } else {
            self.begin_interrupt(now, AfterInterrupt::NextRecall, hooks);
        }
    }

    fn complete_task(
        &mut self,
        now: Duration,
        task: ActiveTask,
        code: &'static str,
        hooks: &mut Hooks<'_>,
    ) -> GlyphResult<()> {
        self.round.completed[task.row] = true;
        self.round.active = None;
        self.round.cursor = 0;

        let delay = match task.kind {
            TaskKind::Practice => {
                self.stats.record_visible_success(code);
                hooks.ledger.set_completed(code)?;
                self.pacing.practice_advance()
            }
            TaskKind::Hidden => {
                self.stats.record_hidden_success(code, self.display_round);
                self.pacing.row_advance()
            }
            TaskKind::Visible => {
                self.stats.record_visible_success(code);
                self.pacing.row_advance()
            }
        };
        hooks.feedback.on_row_success();

        self.transition = Transition::AwaitingRowAdvance;
        self.pending = Some(self.timeline.schedule(now, delay, Continuation::AdvanceRow));
        tracing::debug!(code, row = task.row, kind = %task.kind, "Row completed");
        Ok(())
    }

    /// Reset the entry and charge the round's free-error allowance.
    fn wrong_key(&mut self, task: ActiveTask, hooks: &mut Hooks<'_>) {
        self.round.cursor = 0;
        match task.kind {
            TaskKind::Hidden => {
                if self.round.free_hidden_used < self.tuning.hidden_free_errors {
                    self.round.free_hidden_used += 1;
                } else if let Some(code) = self.round.code_at(task.row) {
                    self.stats.record_hidden_failure(code, self.display_round);
                }
            }
            TaskKind::Visible => {
                // Visible errors past the allowance carry no penalty.
                if self.round.free_visible_used < self.tuning.visible_free_errors {
                    self.round.free_visible_used += 1;
                }
            }
            TaskKind::Practice => {}
        }
        hooks.feedback.on_row_error();
        tracing::debug!(row = task.row, kind = %task.kind, "Wrong key");
    }

    // ========================================================================
    // Interrupts and continuations
    // ========================================================================

    fn begin_interrupt(&mut self, now: Duration, after: AfterInterrupt, hooks: &mut Hooks<'_>) {
        let duration = self.pacing.interrupt();
        self.round.active = None;
        self.round.cursor = 0;
        self.transition = Transition::AwaitingInterrupt;
        self.cycle.skipped = false;
        self.pending = Some(
            self.timeline
                .schedule(now, duration, Continuation::InterruptDone(after)),
        );
        hooks.interrupt.show(duration);
        tracing::debug!(?after, round = self.display_round, "Pattern interrupt");
        self.render(hooks);
    }

    /// Update the skip streak; true if this interrupt earns a challenge.
    fn close_interrupt_cycle(&mut self) -> bool {
        if self.cycle.skipped {
            self.cycle.streak += 1;
        } else {
            self.cycle.streak = 0;
        }
        let challenge = self.cycle.skipped && self.cycle.streak % CHALLENGE_STREAK == 0;
        self.cycle.skipped = false;
        challenge
    }

    fn fire(
        &mut self,
        now: Duration,
        token: Token,
        continuation: Continuation,
        hooks: &mut Hooks<'_>,
    ) -> GlyphResult<()> {
        match continuation {
            Continuation::AdvanceRow => {
                if self.pending == Some(token) {
                    self.pending = None;
                }
                self.transition = Transition::Idle;
                match self.phase {
                    Phase::Practice => self.advance_practice(now, hooks),
                    Phase::Recall => self.next_task(now, hooks)?,
                    Phase::Promoted => {}
                }
            }
            Continuation::InterruptDone(after) => {
                self.pending = None;
                self.transition = Transition::Idle;
                hooks.interrupt.hide();
                let challenge = self.close_interrupt_cycle();
                self.display_round += 1;
                match after {
                    AfterInterrupt::RepeatPractice => self.repeat_practice(hooks),
                    AfterInterrupt::StartRecall | AfterInterrupt::NextRecall => {
                        self.start_recall_round(now, hooks)?
                    }
                    AfterInterrupt::RepeatRecall => self.repeat_recall_round(now, hooks)?,
                }
                if challenge {
                    self.arm_challenge(now, hooks);
                }
            }
            Continuation::ChallengeMask(code) => {
                self.challenge = None;
                self.mask_row(code);
                self.render(hooks);
            }
        }
        Ok(())
    }

    /// Pick the first open visible row and mask it after a short flash.
    fn arm_challenge(&mut self, now: Duration, hooks: &mut Hooks<'_>) {
        if self.phase != Phase::Recall {
            return;
        }
        let Some(row) = (0..self.round.rows.len()).find(|&r| self.can_mask(r)) else {
            return;
        };
        let code = self.round.rows[row].code;
        hooks.feedback.on_challenge(row);
        self.challenge = Some(self.timeline.schedule(
            now,
            self.pacing.challenge_flash(),
            Continuation::ChallengeMask(code),
        ));
        tracing::info!(row, code, streak = self.cycle.streak, "Challenge armed");
    }

    fn can_mask(&self, row: usize) -> bool {
        !self.round.is_completed(row)
            && !self.round.hidden_planned.contains(&row)
            && !self.round.active.is_some_and(|t| t.row == row)
    }

    /// Move a row from the visible batch into the hidden one.
    fn mask_row(&mut self, code: &str) {
        let Some(row) = self.round.row_of(code) else {
            return;
        };
        if self.phase != Phase::Recall || !self.can_mask(row) {
            return;
        }
        self.round.visible_required.retain(|&r| r != row);
        self.round.hidden_planned.push(row);
        tracing::debug!(row, code, "Challenge masked row");
    }

    fn promote(&mut self, hooks: &mut Hooks<'_>) {
        self.cancel_pending(hooks);
        self.phase = Phase::Promoted;
        self.round.active = None;
        tracing::info!(
            round = self.display_round,
            recall_rounds = self.recall_rounds_completed,
            pool = self.pool.len(),
            "Stage 1 complete"
        );
        self.render(hooks);
    }

    /// Drop every pending continuation and close a playing interrupt.
    fn cancel_pending(&mut self, hooks: &mut Hooks<'_>) {
        self.timeline.clear();
        self.pending = None;
        self.challenge = None;
        if self.transition == Transition::AwaitingInterrupt {
            hooks.interrupt.hide();
        }
        self.transition = Transition::Idle;
    }

    fn ensure_live(&self) -> GlyphResult<()> {
        if self.phase == Phase::Promoted {
            return Err(GlyphError::wrong_stage("Stage 1 has already been promoted"));
        }
        Ok(())
    }

    pub(super) fn render(&self, hooks: &mut Hooks<'_>) {
        hooks.feedback.render_round(&self.view());
    }
}
