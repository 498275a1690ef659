//! The trainer session: one learner working through Stage 1 and Stage 2.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::catalog::{normalize_code, SymbolCatalog};
use crate::config::TrainerConfig;
use crate::error::{GlyphError, GlyphResult};
use crate::feedback::{FeedbackSink, Hooks, PatternInterrupt};
use crate::ledger::ProgressLedger;
use crate::stage1::{ReconcileOutcome, RoundView, SessionReconciler, Stage1Progress, Stage1Scheduler};
use crate::stage2::{Stage2Handoff, Stage2Session, Stage2View};
use crate::types::{KeyEvent, StageKind};
use crate::working_set::WorkingSetBuilder;

/// The live stage.
#[derive(Debug)]
pub enum Stage {
    Stage1(Box<Stage1Scheduler>),
    Stage2(Box<Stage2Session>),
    Finished,
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Stage1(_) => StageKind::Stage1,
            Self::Stage2(_) => StageKind::Stage2,
            Self::Finished => StageKind::Finished,
        }
    }
}

/// Owns the active symbol set, the ledger, the presentation collaborators
/// and whichever stage is live.
///
/// All methods take the caller's clock; continuations fire from
/// [`advance_to`](Self::advance_to).
pub struct TrainerSession<F: FeedbackSink, I: PatternInterrupt> {
    id: Uuid,
    config: TrainerConfig,
    catalog: &'static SymbolCatalog,
    active: BTreeSet<String>,
    ledger: Arc<dyn ProgressLedger>,
    feedback: F,
    interrupt: I,
    stage: Stage,
    show_all: bool,
    rng: StdRng,
}

impl<F: FeedbackSink, I: PatternInterrupt> TrainerSession<F, I> {
    /// Start a session on the configured pack with a fresh initial set.
    pub fn new(
        config: TrainerConfig,
        ledger: Arc<dyn ProgressLedger>,
        feedback: F,
        interrupt: I,
        mut rng: StdRng,
    ) -> GlyphResult<Self> {
        config.validate()?;
        let catalog = SymbolCatalog::builtin();
        let prefs = &config.preferences;
        let minimum = config.tuning.min_working_set;
        let pack_len = catalog.distinct_len(prefs.pack)?;
        let size = prefs.resolved_set_size(pack_len, minimum);
        let active =
            catalog.initial_active_codes(prefs.pack, size, minimum, prefs.order_mode, &mut rng)?;
        Self::with_active_codes(config, active, ledger, feedback, interrupt, rng)
    }

    /// Start a session on an explicit set of codes.
    pub fn with_active_codes(
        config: TrainerConfig,
        active: BTreeSet<String>,
        ledger: Arc<dyn ProgressLedger>,
        feedback: F,
        interrupt: I,
        mut rng: StdRng,
    ) -> GlyphResult<Self> {
        config.validate()?;
        let catalog = SymbolCatalog::builtin();
        let active = active
            .iter()
            .map(|raw| {
                let code = normalize_code(raw)?;
                if catalog.contains(&code) {
                    Ok(code)
                } else {
                    Err(GlyphError::not_found(code))
                }
            })
            .collect::<GlyphResult<BTreeSet<String>>>()?;

        let working_set =
            WorkingSetBuilder::new(catalog).build(&active, config.preferences.order_mode);
        let scheduler =
            Stage1Scheduler::new(&config, working_set, StdRng::seed_from_u64(rng.gen()))?;
        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            pack = %config.preferences.pack,
            active = active.len(),
            "Trainer session created"
        );

        Ok(Self {
            id,
            config,
            catalog,
            active,
            ledger,
            feedback,
            interrupt,
            stage: Stage::Stage1(Box::new(scheduler)),
            show_all: false,
            rng,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn active_codes(&self) -> &BTreeSet<String> {
        &self.active
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn stage1(&self) -> Option<&Stage1Scheduler> {
        match &self.stage {
            Stage::Stage1(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Whether Stage 1 is waiting on the learner with nothing pending.
    pub fn is_settled(&self) -> bool {
        self.stage1().is_some_and(Stage1Scheduler::is_settled)
    }

    pub fn stage2(&self) -> Option<&Stage2Session> {
        match &self.stage {
            Stage::Stage2(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    pub fn ledger(&self) -> &dyn ProgressLedger {
        self.ledger.as_ref()
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    pub fn interrupt(&self) -> &I {
        &self.interrupt
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn round_view(&self) -> Option<RoundView> {
        self.stage1().map(Stage1Scheduler::view)
    }

    pub fn stage2_view(&self) -> Option<Stage2View> {
        self.stage2().map(Stage2Session::view)
    }

    pub fn progress(&self) -> Option<Stage1Progress> {
        self.stage1().map(Stage1Scheduler::progress)
    }

    /// When the next continuation is due, if any.
    pub fn next_due(&self) -> Option<Duration> {
        match &self.stage {
            Stage::Stage1(s) => s.next_due(),
            Stage::Stage2(d) => d.next_due(),
            Stage::Finished => None,
        }
    }

    /// Draw the first frame.
    pub fn start(&mut self) {
        let mut hooks = Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
        match &mut self.stage {
            Stage::Stage1(s) => s.start(&mut hooks),
            Stage::Stage2(d) => d.start(&mut hooks),
            Stage::Finished => {}
        }
    }

    pub fn handle_key(&mut self, now: Duration, key: KeyEvent) -> GlyphResult<()> {
        {
            let mut hooks =
                Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
            match &mut self.stage {
                Stage::Stage1(s) => s.handle_key(now, key, &mut hooks)?,
                Stage::Stage2(d) => d.handle_key(now, key, &mut hooks)?,
                Stage::Finished => {
                    return Err(GlyphError::wrong_stage("Training is already finished"))
                }
            }
        }
        self.check_transitions()
    }

    /// Fire every continuation due at or before `now`.
    pub fn advance_to(&mut self, now: Duration) -> GlyphResult<()> {
        {
            let mut hooks =
                Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
            match &mut self.stage {
                Stage::Stage1(s) => s.advance_to(now, &mut hooks)?,
                Stage::Stage2(d) => d.advance_to(now, &mut hooks)?,
                Stage::Finished => {}
            }
        }
        self.check_transitions()
    }

    /// Hurry the pattern interrupt. False when none is playing.
    pub fn skip_interrupt(&mut self, now: Duration) -> GlyphResult<bool> {
        let mut hooks = Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
        match &mut self.stage {
            Stage::Stage1(s) => Ok(s.skip_interrupt(now, &mut hooks)),
            _ => Err(GlyphError::wrong_stage("Interrupts only play in Stage 1")),
        }
    }

    /// Finish the current round as perfect and move to Stage 2.
    pub fn skip_to_next_round(&mut self) -> GlyphResult<()> {
        {
            let mut hooks =
                Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
            match &mut self.stage {
                Stage::Stage1(s) => s.skip_to_next_round(&mut hooks)?,
                _ => return Err(GlyphError::wrong_stage("Round skipping is a Stage 1 operation")),
            }
        }
        self.check_transitions()
    }

    /// Debug: complete the current round as if typed.
    pub fn force_complete_round(&mut self, now: Duration) -> GlyphResult<()> {
        {
            let mut hooks =
                Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
            match &mut self.stage {
                Stage::Stage1(s) => s.force_complete_round(now, &mut hooks)?,
                _ => return Err(GlyphError::wrong_stage("Forcing a round is a Stage 1 operation")),
            }
        }
        self.check_transitions()
    }

    /// Flip one code in or out of the active set. Returns whether it is now
    /// active.
    pub fn toggle_symbol(&mut self, now: Duration, code: &str) -> GlyphResult<bool> {
        let code = normalize_code(code)?;
        if !self.catalog.contains(&code) {
            return Err(GlyphError::not_found(code));
        }
        let mut next = self.active.clone();
        let now_active = if next.remove(&code) {
            false
        } else {
            next.insert(code.clone());
            true
        };
        let minimum = self.config.tuning.min_working_set;
        if next.len() < minimum {
            tracing::warn!(code = %code, minimum, "Refusing to deactivate symbol");
            return Err(GlyphError::set_too_small(next.len(), minimum));
        }

        {
            let mut hooks =
                Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
            match &mut self.stage {
                Stage::Stage1(s) => {
                    SessionReconciler::reconcile(
                        s,
                        &self.active,
                        &next,
                        self.catalog,
                        self.show_all,
                        now,
                        &mut hooks,
                    )?;
                }
                Stage::Stage2(d) => {
                    let ws = WorkingSetBuilder::new(self.catalog)
                        .build(&next, self.config.preferences.order_mode);
                    d.rebuild(&ws, self.ledger.as_ref(), &mut hooks)?;
                }
                Stage::Finished => {}
            }
        }
        tracing::info!(code = %code, active = now_active, size = next.len(), "Symbol toggled");
        self.active = next;
        self.check_transitions()?;
        Ok(now_active)
    }

    /// Switch the "show all symbols" override.
    pub fn set_show_all(&mut self, now: Duration, show_all: bool) -> GlyphResult<ReconcileOutcome> {
        let mut hooks = Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
        let Stage::Stage1(s) = &mut self.stage else {
            return Err(GlyphError::wrong_stage("Show-all only applies to Stage 1"));
        };
        let outcome = SessionReconciler::reconcile(
            s,
            &self.active,
            &self.active,
            self.catalog,
            show_all,
            now,
            &mut hooks,
        )?;
        self.show_all = show_all;
        Ok(outcome)
    }

    pub fn set_show_new_immediately(&mut self, show: bool) {
        self.config.preferences.show_new_immediately = show;
        if let Stage::Stage1(s) = &mut self.stage {
            s.set_show_new_immediately(show);
        }
    }

    /// Promote a finished Stage 1 and retire a finished Stage 2.
    fn check_transitions(&mut self) -> GlyphResult<()> {
        let mut hooks = Hooks::new(self.ledger.as_ref(), &mut self.feedback, &mut self.interrupt);
        match &self.stage {
            Stage::Stage1(s) if s.is_promoted() => {
                let drill = Stage2Handoff::promote(
                    s.working_set(),
                    hooks.ledger,
                    &self.config,
                    s.modifier_held(),
                    StdRng::seed_from_u64(self.rng.gen()),
                )?;
                self.stage = Stage::Stage2(Box::new(drill));
                hooks.feedback.on_stage_changed(StageKind::Stage2);
                if let Stage::Stage2(d) = &mut self.stage {
                    d.start(&mut hooks);
                }
                tracing::info!(session = %self.id, "Entered Stage 2");
            }
            Stage::Stage2(d) if d.is_finished() => {
                self.stage = Stage::Finished;
                hooks.feedback.on_stage_changed(StageKind::Finished);
                tracing::info!(session = %self.id, "Training finished");
            }
            _ => {}
        }
        Ok(())
    }
}
