//! Stage 2: timed single-symbol recall with escalating hints.
//!
//! One symbol is prompted at a time with its code hidden. A wrong digit
//! reveals one more trailing character of the code; running out the trial
//! timer counts as an error and shows the reinforcement table. Each
//! correct recall is persisted to the ledger, and the drill is complete
//! once every symbol has [`REQUIRED_RECALLS`] of them.

use super::handoff::REQUIRED_RECALLS;
use crate::catalog::Symbol;
use crate::config::PacingConfig;
use crate::error::{GlyphError, GlyphResult};
use crate::feedback::Hooks;
use crate::ledger::ProgressLedger;
use crate::timeline::{Timeline, Token};
use crate::types::{KeyEvent, OrderMode};
use crate::working_set::WorkingSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use strum::Display;

/// Longest hint: the whole code.
pub const MAX_HINT_LEVEL: usize = 4;

/// How often the reinforcement table follows a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReinforcementCadence {
    EveryTrial,
    EveryOther,
    Never,
}

impl ReinforcementCadence {
    fn period(self) -> Option<u32> {
        match self {
            Self::EveryTrial => Some(1),
            Self::EveryOther => Some(2),
            Self::Never => None,
        }
    }
}

/// Where the drill is between trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DrillState {
    Answering,
    Advancing,
    Reinforcing,
    Finishing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    TrialTimeout,
    NextTrial,
    Finish,
}

/// Prompt as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage2View {
    pub symbol: Symbol,
    /// Hint with the typed prefix laid over it.
    pub hint: String,
    pub hint_level: usize,
    pub rounds_completed: u32,
    pub total_rounds: u32,
    pub waiting_for_first_key: bool,
    pub state: DrillState,
}

/// `code` with all but the last `level` characters replaced by `?`.
pub fn hint_string(code: &str, level: usize) -> String {
    let len = code.chars().count();
    code.chars()
        .enumerate()
        .map(|(i, c)| if i + level >= len { c } else { '?' })
        .collect()
}

/// The live Stage 2 drill.
#[derive(Debug)]
pub struct Stage2Session {
    pacing: PacingConfig,
    order: OrderMode,
    pool: Vec<Symbol>,
    recalls: BTreeMap<String, u32>,
    queue: VecDeque<Symbol>,
    current: Symbol,
    typed: String,
    hint_level: usize,
    successes: u32,
    cadence: ReinforcementCadence,
    state: DrillState,
    waiting_for_first_key: bool,
    modifier_held: bool,
    timer: Option<Token>,
    step: Option<Token>,
    timeline: Timeline<Step>,
    rng: StdRng,
}

impl Stage2Session {
    pub fn new(
        working_set: &WorkingSet,
        ledger: &dyn ProgressLedger,
        pacing: PacingConfig,
        order: OrderMode,
        modifier_held: bool,
        rng: StdRng,
    ) -> GlyphResult<Self> {
        let pool = working_set.symbols().to_vec();
        let Some(&first) = pool.first() else {
            return Err(GlyphError::set_too_small(0, 1));
        };
        let mut session = Self {
            pacing,
            order,
            recalls: BTreeMap::new(),
            queue: VecDeque::new(),
            current: first,
            typed: String::new(),
            hint_level: 0,
            successes: 0,
            cadence: ReinforcementCadence::EveryTrial,
            state: DrillState::Answering,
            waiting_for_first_key: true,
            modifier_held,
            timer: None,
            step: None,
            timeline: Timeline::new(),
            rng,
            pool,
        };
        session.load_recalls(ledger)?;
        session.refill_queue();
        if let Some(symbol) = session.queue.pop_front() {
            session.current = symbol;
        }
        Ok(session)
    }

    pub fn start(&mut self, hooks: &mut Hooks<'_>) {
        self.render(hooks);
    }

    pub fn state(&self) -> DrillState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == DrillState::Finished
    }

    pub fn current(&self) -> Symbol {
        self.current
    }

    pub fn cadence(&self) -> ReinforcementCadence {
        self.cadence
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn hint_level(&self) -> usize {
        self.hint_level
    }

    pub fn modifier_held(&self) -> bool {
        self.modifier_held
    }

    pub fn pool(&self) -> &[Symbol] {
        &self.pool
    }

    pub fn recalls_for(&self, code: &str) -> u32 {
        self.recalls.get(code).copied().unwrap_or(0)
    }

    /// Sum of recalls, each capped at the requirement.
    pub fn rounds_completed(&self) -> u32 {
        self.pool
            .iter()
            .map(|s| self.recalls_for(s.code).min(REQUIRED_RECALLS))
            .sum()
    }

    pub fn total_rounds(&self) -> u32 {
        self.pool.len() as u32 * REQUIRED_RECALLS
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timeline.next_due()
    }

    pub fn view(&self) -> Stage2View {
        let hint: String = hint_string(self.current.code, self.hint_level)
            .chars()
            .enumerate()
            .map(|(i, c)| self.typed.chars().nth(i).unwrap_or(c))
            .collect();
        Stage2View {
            symbol: self.current,
            hint,
            hint_level: self.hint_level,
            rounds_completed: self.rounds_completed(),
            total_rounds: self.total_rounds(),
            waiting_for_first_key: self.waiting_for_first_key,
            state: self.state,
        }
    }

    /// Feed one key event. Keys outside a trial are ignored.
    pub fn handle_key(&mut self, now: Duration, key: KeyEvent, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        match key {
            KeyEvent::ModifierDown => {
                self.modifier_held = true;
                return Ok(());
            }
            KeyEvent::ModifierUp => {
                self.modifier_held = false;
                return Ok(());
            }
            _ => {}
        }
        if self.state != DrillState::Answering {
            return Ok(());
        }
        if self.waiting_for_first_key {
            self.waiting_for_first_key = false;
            self.timer = Some(
                self.timeline
                    .schedule(now, self.pacing.stage2_trial(), Step::TrialTimeout),
            );
            tracing::debug!(code = self.current.code, "Trial timer started");
        }

        let KeyEvent::Hex(digit) = key else {
            self.render(hooks);
            return Ok(());
        };
        if !self.modifier_held {
            self.render(hooks);
            return Ok(());
        }

        let position = self.typed.chars().count();
        if self.current.code.chars().nth(position) == Some(digit.as_char()) {
            self.typed.push(digit.as_char());
            hooks.feedback.on_correct_char(position);
            if position + 1 >= self.current.code.len() {
                self.succeed(now, hooks)?;
            }
        } else {
            self.fail(hooks);
        }
        self.render(hooks);
        Ok(())
    }

    /// Fire every step due at or before `now`.
    pub fn advance_to(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        while let Some(due) = self.timeline.next_due().filter(|d| *d <= now) {
            let Some((token, step)) = self.timeline.pop_due(due) else {
                break;
            };
            match step {
                Step::TrialTimeout => {
                    if self.timer == Some(token) {
                        self.timer = None;
                        self.time_out(due, hooks);
                    }
                }
                Step::NextTrial => {
                    self.step = None;
                    self.next_trial(hooks);
                }
                Step::Finish => {
                    self.step = None;
                    if self.all_recalled() {
                        self.state = DrillState::Finished;
                        tracing::info!(successes = self.successes, "Stage 2 complete");
                        self.render(hooks);
                    } else {
                        self.next_trial(hooks);
                    }
                }
            }
        }
        Ok(())
    }

    /// Swap in a new working set, keeping the current prompt if it survives.
    pub fn rebuild(&mut self, working_set: &WorkingSet, ledger: &dyn ProgressLedger, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        if working_set.is_empty() {
            return Err(GlyphError::set_too_small(0, 1));
        }
        self.pool = working_set.symbols().to_vec();
        self.load_recalls(ledger)?;
        self.queue.retain(|s| working_set.contains(s.code));

        if !working_set.contains(self.current.code) && self.state == DrillState::Answering {
            if let Some(token) = self.timer.take() {
                self.timeline.cancel(token);
            }
            self.next_trial(hooks);
        } else {
            self.render(hooks);
        }
        tracing::info!(
            pool = self.pool.len(),
            completed = self.rounds_completed(),
            "Stage 2 pool rebuilt"
        );
        Ok(())
    }

    fn load_recalls(&mut self, ledger: &dyn ProgressLedger) -> GlyphResult<()> {
        self.recalls.clear();
        for symbol in &self.pool {
            let count = ledger.stage2_recalls(symbol.code)?;
            self.recalls.insert(symbol.code.to_string(), count);
        }
        Ok(())
    }

    fn all_recalled_at_least(&self, n: u32) -> bool {
        self.pool.iter().all(|s| self.recalls_for(s.code) >= n)
    }

    fn all_recalled(&self) -> bool {
        self.all_recalled_at_least(REQUIRED_RECALLS)
    }

    fn succeed(&mut self, now: Duration, hooks: &mut Hooks<'_>) -> GlyphResult<()> {
        if let Some(token) = self.timer.take() {
            self.timeline.cancel(token);
        }
        let code = self.current.code;
        let count = hooks.ledger.increment_stage2_recalls(code)?;
        self.recalls.insert(code.to_string(), count);
        self.successes += 1;
        hooks.feedback.on_row_success();

        let reinforce = self
            .cadence
            .period()
            .is_some_and(|p| self.successes % p == 0);
        match self.cadence {
            ReinforcementCadence::EveryTrial if self.all_recalled_at_least(1) => {
                self.cadence = ReinforcementCadence::EveryOther;
            }
            ReinforcementCadence::EveryOther if self.all_recalled_at_least(REQUIRED_RECALLS) => {
                self.cadence = ReinforcementCadence::Never;
            }
            _ => {}
        }

        let (state, delay, step) =
            if self.all_recalled() && self.cadence == ReinforcementCadence::Never {
                (DrillState::Finishing, self.pacing.stage2_finish(), Step::Finish)
            } else if reinforce {
                hooks.feedback.show_reinforcement(&self.pool);
                (DrillState::Reinforcing, self.pacing.reinforcement(), Step::NextTrial)
            } else {
                (DrillState::Advancing, self.pacing.stage2_advance(), Step::NextTrial)
            };
        self.state = state;
        self.step = Some(self.timeline.schedule(now, delay, step));
        tracing::debug!(
            code,
            recalls = count,
            cadence = %self.cadence,
            next = %state,
            "Stage 2 recall"
        );
        Ok(())
    }

    fn fail(&mut self, hooks: &mut Hooks<'_>) {
        self.hint_level = (self.hint_level + 1).min(MAX_HINT_LEVEL);
        self.typed.clear();
        hooks.feedback.on_row_error();
        tracing::debug!(code = self.current.code, hint = self.hint_level, "Stage 2 error");
    }

    fn time_out(&mut self, now: Duration, hooks: &mut Hooks<'_>) {
        if self.state != DrillState::Answering {
            return;
        }
        self.fail(hooks);
        hooks.feedback.show_reinforcement(&self.pool);
        self.state = DrillState::Reinforcing;
        self.step = Some(
            self.timeline
                .schedule(now, self.pacing.reinforcement(), Step::NextTrial),
        );
        tracing::debug!(code = self.current.code, "Stage 2 trial timed out");
        self.render(hooks);
    }

    fn refill_queue(&mut self) {
        let mut batch = self.pool.clone();
        if self.order.is_random() {
            batch.shuffle(&mut self.rng);
            // Avoid prompting the same symbol twice in a row across refills.
            if batch.len() > 1 && batch[0].code == self.current.code {
                batch.swap(0, 1);
            }
        }
        self.queue.extend(batch);
    }

    fn next_trial(&mut self, hooks: &mut Hooks<'_>) {
        if self.queue.is_empty() {
            self.refill_queue();
        }
        if let Some(symbol) = self.queue.pop_front() {
            self.current = symbol;
        }
        self.typed.clear();
        self.hint_level = 0;
        self.waiting_for_first_key = true;
        self.state = DrillState::Answering;
        self.render(hooks);
    }

    fn render(&self, hooks: &mut Hooks<'_>) {
        hooks.feedback.render_stage2(&self.view());
    }
}
