//! Shared helpers for driving sessions through the public API.

#![allow(dead_code)]

use glyphdrill_core::{
    HexDigit, Hooks, InMemoryLedger, KeyEvent, OrderMode, PackChoice, Phase, RecordingInterrupt,
    RecordingSink, Stage1Scheduler, SymbolCatalog, TrainerConfig, TrainerSession, Transition,
    WorkingSet, WorkingSetBuilder,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub type Session = TrainerSession<RecordingSink, RecordingInterrupt>;

/// First `n` Basic Greek codes in catalog order.
pub fn greek(n: usize) -> BTreeSet<String> {
    SymbolCatalog::builtin()
        .pack(PackChoice::BasicGreek)
        .unwrap()
        .iter()
        .take(n)
        .map(|s| s.code.to_string())
        .collect()
}

pub fn sequential_config(debug: bool) -> TrainerConfig {
    TrainerConfig::builder()
        .order_mode(OrderMode::Sequential)
        .debug(debug)
        .build()
        .unwrap()
}

pub fn working_set(codes: &BTreeSet<String>, order: OrderMode) -> WorkingSet {
    WorkingSetBuilder::new(SymbolCatalog::builtin()).build(codes, order)
}

pub fn session(n: usize, config: TrainerConfig, seed: u64) -> Session {
    let mut session = TrainerSession::with_active_codes(
        config,
        greek(n),
        Arc::new(InMemoryLedger::new()),
        RecordingSink::new(),
        RecordingInterrupt::default(),
        StdRng::seed_from_u64(seed),
    )
    .unwrap();
    session.start();
    session
}

/// A digit that does not match `code` at `pos`.
pub fn wrong_digit(code: &str, pos: usize) -> KeyEvent {
    let wrong = if code.chars().nth(pos) == Some('F') { '0' } else { 'F' };
    KeyEvent::Hex(HexDigit::from_char(wrong).unwrap())
}

/// Simulated learner with a virtual clock.
pub struct Learner {
    pub now: Duration,
    /// Chance of one wrong digit before each masked row.
    pub error_rate: f64,
    rng: StdRng,
}

impl Learner {
    pub fn new(seed: u64) -> Self {
        Self::with_error_rate(seed, 0.0)
    }

    pub fn with_error_rate(seed: u64, error_rate: f64) -> Self {
        Self {
            now: Duration::ZERO,
            error_rate,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn code_for_session(session: &Session) -> Option<(&'static str, bool)> {
        if let Some(view) = session.round_view() {
            if view.transition != Transition::Idle {
                return None;
            }
            let row = &view.rows[view.highlight_row?];
            return Some((row.symbol.code, row.is_masked));
        }
        let view = session.stage2_view()?;
        (view.state == glyphdrill_core::DrillState::Answering).then_some((view.symbol.code, true))
    }

    /// Type the prompted code if input is open, then fire the next delay.
    pub fn step(&mut self, session: &mut Session) {
        if let Some((code, masked)) = Self::code_for_session(session) {
            session.handle_key(self.now, KeyEvent::ModifierDown).unwrap();
            if masked && self.rng.gen_bool(self.error_rate) {
                session.handle_key(self.now, wrong_digit(code, 0)).unwrap();
            }
            for key in KeyEvent::sequence_for(code) {
                session.handle_key(self.now, key).unwrap();
            }
        }
        self.settle(session);
    }

    /// Jump the clock to the next due continuation and fire it.
    pub fn settle(&mut self, session: &mut Session) -> bool {
        match session.next_due() {
            Some(due) => {
                self.now = self.now.max(due);
                session.advance_to(self.now).unwrap();
                true
            }
            None => false,
        }
    }

    /// Type through practice, then let the start-recall interrupt finish
    /// so the first recall round is on screen.
    pub fn finish_practice(&mut self, session: &mut Session) {
        let mut guard = 0;
        while session.stage1().unwrap().phase() == Phase::Practice {
            self.step(session);
            guard += 1;
            assert!(guard < 200, "practice never ended");
        }
        while !session.is_settled() {
            assert!(self.settle(session), "stalled before the first recall round");
        }
    }

    /// Same as [`step`](Self::step) against a bare scheduler.
    pub fn step_scheduler(&mut self, scheduler: &mut Stage1Scheduler, hooks: &mut Hooks<'_>) {
        if scheduler.transition() == Transition::Idle && scheduler.phase() != Phase::Promoted {
            let view = scheduler.view();
            if let Some(row) = view.highlight_row {
                let code = view.rows[row].symbol.code;
                let masked = view.rows[row].is_masked;
                scheduler.handle_key(self.now, KeyEvent::ModifierDown, hooks).unwrap();
                if masked && self.rng.gen_bool(self.error_rate) {
                    scheduler.handle_key(self.now, wrong_digit(code, 0), hooks).unwrap();
                }
                for key in KeyEvent::sequence_for(code) {
                    scheduler.handle_key(self.now, key, hooks).unwrap();
                }
            }
        }
        if let Some(due) = scheduler.next_due() {
            self.now = self.now.max(due);
            scheduler.advance_to(self.now, hooks).unwrap();
        }
    }
}
