//! Boundary traits toward the presentation layer.
//!
//! The scheduler never draws or plays anything itself. It reports state
//! through a [`FeedbackSink`] and asks a [`PatternInterrupt`] to show the
//! between-round animation; the interrupt's completion is owned by the
//! scheduler's timeline, so it fires exactly once.

use crate::catalog::Symbol;
use crate::ledger::ProgressLedger;
use crate::stage1::RoundView;
use crate::stage2::Stage2View;
use crate::types::StageKind;
use std::time::Duration;

/// Rendering and audio notifications. All fire-and-forget.
#[cfg_attr(test, mockall::automock)]
pub trait FeedbackSink {
    /// Redraw the Stage 1 table.
    fn render_round(&mut self, view: &RoundView);

    /// A correct character was typed at `position` (0-based).
    fn on_correct_char(&mut self, position: usize);

    /// A row (or Stage 2 trial) was completed.
    fn on_row_success(&mut self);

    /// A wrong key reset the current entry.
    fn on_row_error(&mut self);

    /// The planned round count grew to `total_rounds`.
    fn on_round_extended(&mut self, total_rounds: u32);

    /// The session moved to another stage.
    fn on_stage_changed(&mut self, stage: StageKind);

    /// A skip-streak challenge is about to mask the given row.
    fn on_challenge(&mut self, row: usize);

    /// Redraw the Stage 2 prompt.
    fn render_stage2(&mut self, view: &Stage2View);

    /// Show the Stage 2 reinforcement table.
    fn show_reinforcement(&mut self, symbols: &[Symbol]);
}

/// The between-round pattern-interrupt animation.
#[cfg_attr(test, mockall::automock)]
pub trait PatternInterrupt {
    /// Start the animation; it is expected to last `duration`.
    fn show(&mut self, duration: Duration);

    /// The user asked to hurry; `remaining` is the new time left.
    fn accelerate(&mut self, remaining: Duration);

    /// The animation is over.
    fn hide(&mut self);
}

/// Collaborators borrowed for the duration of one scheduler call.
pub struct Hooks<'a> {
    pub ledger: &'a dyn ProgressLedger,
    pub feedback: &'a mut dyn FeedbackSink,
    pub interrupt: &'a mut dyn PatternInterrupt,
}

impl<'a> Hooks<'a> {
    pub fn new(
        ledger: &'a dyn ProgressLedger,
        feedback: &'a mut dyn FeedbackSink,
        interrupt: &'a mut dyn PatternInterrupt,
    ) -> Self {
        Self {
            ledger,
            feedback,
            interrupt,
        }
    }
}

/// Notification captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackEvent {
    CorrectChar(usize),
    RowSuccess,
    RowError,
    RoundExtended(u32),
    StageChanged(StageKind),
    Challenge(usize),
    Reinforcement(usize),
}

/// Sink that keeps every notification and the latest views.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<FeedbackEvent>,
    pub last_round: Option<RoundView>,
    pub last_stage2: Option<Stage2View>,
    pub renders: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, predicate: impl Fn(&FeedbackEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl FeedbackSink for RecordingSink {
    fn render_round(&mut self, view: &RoundView) {
        self.renders += 1;
        self.last_round = Some(view.clone());
    }

    fn on_correct_char(&mut self, position: usize) {
        self.events.push(FeedbackEvent::CorrectChar(position));
    }

    fn on_row_success(&mut self) {
        self.events.push(FeedbackEvent::RowSuccess);
    }

    fn on_row_error(&mut self) {
        self.events.push(FeedbackEvent::RowError);
    }

    fn on_round_extended(&mut self, total_rounds: u32) {
        self.events.push(FeedbackEvent::RoundExtended(total_rounds));
    }

    fn on_stage_changed(&mut self, stage: StageKind) {
        self.events.push(FeedbackEvent::StageChanged(stage));
    }

    fn on_challenge(&mut self, row: usize) {
        self.events.push(FeedbackEvent::Challenge(row));
    }

    fn render_stage2(&mut self, view: &Stage2View) {
        self.renders += 1;
        self.last_stage2 = Some(view.clone());
    }

    fn show_reinforcement(&mut self, symbols: &[Symbol]) {
        self.events.push(FeedbackEvent::Reinforcement(symbols.len()));
    }
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FeedbackSink for TracingSink {
    fn render_round(&mut self, view: &RoundView) {
        tracing::trace!(
            phase = %view.phase,
            round = view.display_round,
            total = view.total_rounds,
            rows = view.rows.len(),
            highlight = ?view.highlight_row,
            "Render round"
        );
    }

    fn on_correct_char(&mut self, position: usize) {
        tracing::trace!(position, "Correct character");
    }

    fn on_row_success(&mut self) {
        tracing::debug!("Row success");
    }

    fn on_row_error(&mut self) {
        tracing::debug!("Row error");
    }

    fn on_round_extended(&mut self, total_rounds: u32) {
        tracing::info!(total_rounds, "Round count extended");
    }

    fn on_stage_changed(&mut self, stage: StageKind) {
        tracing::info!(%stage, "Stage changed");
    }

    fn on_challenge(&mut self, row: usize) {
        tracing::info!(row, "Challenge: masking one more row");
    }

    fn render_stage2(&mut self, view: &Stage2View) {
        tracing::trace!(
            glyph = view.symbol.glyph,
            hint = %view.hint,
            completed = view.rounds_completed,
            total = view.total_rounds,
            "Render stage 2"
        );
    }

    fn show_reinforcement(&mut self, symbols: &[Symbol]) {
        tracing::debug!(symbols = symbols.len(), "Reinforcement table");
    }
}

/// Interrupt that counts calls and does nothing else.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordingInterrupt {
    pub shown: u32,
    pub accelerated: u32,
    pub hidden: u32,
}

impl PatternInterrupt for RecordingInterrupt {
    fn show(&mut self, _duration: Duration) {
        self.shown += 1;
    }

    fn accelerate(&mut self, _remaining: Duration) {
        self.accelerated += 1;
    }

    fn hide(&mut self) {
        self.hidden += 1;
    }
}

/// Interrupt that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterrupt;

impl PatternInterrupt for TracingInterrupt {
    fn show(&mut self, duration: Duration) {
        tracing::debug!(duration_ms = duration.as_millis() as u64, "Pattern interrupt");
    }

    fn accelerate(&mut self, remaining: Duration) {
        tracing::debug!(remaining_ms = remaining.as_millis() as u64, "Interrupt accelerated");
    }

    fn hide(&mut self) {
        tracing::trace!("Interrupt finished");
    }
}
