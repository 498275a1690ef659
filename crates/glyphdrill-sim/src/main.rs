//! glyphdrill-sim - drive a trainer session with a simulated learner.
//!
//! Runs on a virtual clock by default. Set `GLYPHDRILL_SIM_REALTIME=1` to
//! sleep through every pacing delay instead.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use glyphdrill_core::{
    DrillState, HexDigit, InMemoryLedger, KeyEvent, ProgressLedger, SqliteLedger, StageKind,
    TracingInterrupt, TracingSink, TrainerConfig, TrainerSession, Transition,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Session = TrainerSession<TracingSink, TracingInterrupt>;

/// Steps after which a run is considered stuck.
const MAX_STEPS: usize = 20_000;

struct SimOptions {
    seed: u64,
    error_rate: f64,
    realtime: bool,
    ephemeral: bool,
}

impl SimOptions {
    fn from_env() -> anyhow::Result<Self> {
        let seed = match std::env::var("GLYPHDRILL_SIM_SEED") {
            Ok(raw) => raw.parse().context("GLYPHDRILL_SIM_SEED must be an integer")?,
            Err(_) => rand::thread_rng().gen(),
        };
        let error_rate: f64 = match std::env::var("GLYPHDRILL_SIM_ERROR_RATE") {
            Ok(raw) => raw
                .parse()
                .context("GLYPHDRILL_SIM_ERROR_RATE must be a number")?,
            Err(_) => 0.15,
        };
        if !(0.0..=1.0).contains(&error_rate) {
            bail!("GLYPHDRILL_SIM_ERROR_RATE must be between 0 and 1");
        }
        Ok(Self {
            seed,
            error_rate,
            realtime: std::env::var("GLYPHDRILL_SIM_REALTIME").is_ok(),
            ephemeral: std::env::var("GLYPHDRILL_EPHEMERAL").is_ok(),
        })
    }
}

/// `RUST_LOG` when set, otherwise `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn load_config() -> anyhow::Result<TrainerConfig> {
    match std::env::var("GLYPHDRILL_CONFIG") {
        Ok(path) => TrainerConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path)),
        Err(_) => Ok(TrainerConfig::from_env()),
    }
}

fn open_ledger(config: &TrainerConfig, ephemeral: bool) -> anyhow::Result<Arc<dyn ProgressLedger>> {
    if ephemeral {
        info!("Using in-memory ledger");
        return Ok(Arc::new(InMemoryLedger::new()));
    }
    let ledger = SqliteLedger::new(&config.ledger_path)
        .with_context(|| format!("failed to open ledger at {}", config.ledger_path.display()))?;
    info!(path = %config.ledger_path.display(), "Using SQLite ledger");
    Ok(Arc::new(ledger))
}

/// The code the session is currently asking for, if input is open.
fn prompted_code(session: &Session) -> Option<(&'static str, bool)> {
    if let Some(view) = session.round_view() {
        if view.transition != Transition::Idle {
            return None;
        }
        let row = view.rows.get(view.highlight_row?)?;
        return Some((row.symbol.code, row.is_masked));
    }
    let view = session.stage2_view()?;
    (view.state == DrillState::Answering).then_some((view.symbol.code, true))
}

/// Any digit that is not the one expected first.
fn slip(code: &str) -> KeyEvent {
    let wrong = if code.starts_with('F') { 0 } else { 15 };
    HexDigit::new(wrong).map_or(KeyEvent::Other, KeyEvent::Hex)
}

struct Learner {
    now: Duration,
    error_rate: f64,
    rng: StdRng,
    typed: usize,
    slips: usize,
}

impl Learner {
    fn answer(&mut self, session: &mut Session) -> anyhow::Result<()> {
        let Some((code, masked)) = prompted_code(session) else {
            return Ok(());
        };
        session.handle_key(self.now, KeyEvent::ModifierDown)?;
        if masked && self.rng.gen_bool(self.error_rate) {
            session.handle_key(self.now, slip(code))?;
            self.slips += 1;
        }
        for key in KeyEvent::sequence_for(code) {
            session.handle_key(self.now, key)?;
        }
        self.typed += 1;
        Ok(())
    }
}

async fn run(session: &mut Session, learner: &mut Learner, realtime: bool) -> anyhow::Result<()> {
    for _ in 0..MAX_STEPS {
        if session.stage_kind() == StageKind::Finished {
            return Ok(());
        }
        learner.answer(session)?;

        let Some(due) = session.next_due() else {
            if prompted_code(session).is_none() {
                bail!("session stalled in {}", session.stage_kind());
            }
            continue;
        };
        let due = due.max(learner.now);
        if realtime {
            tokio::time::sleep(due - learner.now).await;
        }
        learner.now = due;
        session.advance_to(learner.now)?;

        if let Some(progress) = session.progress() {
            tracing::debug!(
                round = progress.display_round,
                total = progress.total_rounds,
                hidden = progress.hidden_done,
                "Progress"
            );
        }
    }
    bail!("no result after {} steps", MAX_STEPS)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .init();

    let options = SimOptions::from_env()?;
    let config = load_config()?;
    let ledger = open_ledger(&config, options.ephemeral)?;

    let mut session = TrainerSession::new(
        config,
        ledger,
        TracingSink,
        TracingInterrupt,
        StdRng::seed_from_u64(options.seed),
    )?;
    info!(
        session = %session.id(),
        seed = options.seed,
        symbols = session.active_codes().len(),
        error_rate = options.error_rate,
        "Starting simulated session"
    );
    session.start();

    let mut learner = Learner {
        now: Duration::ZERO,
        error_rate: options.error_rate,
        rng: StdRng::seed_from_u64(options.seed.wrapping_add(1)),
        typed: 0,
        slips: 0,
    };

    tokio::select! {
        result = run(&mut session, &mut learner, options.realtime) => result?,
        _ = signal::ctrl_c() => {
            warn!("Interrupted before training finished");
            return Ok(());
        }
    }

    info!(
        answers = learner.typed,
        slips = learner.slips,
        virtual_secs = learner.now.as_secs(),
        "Training finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_env_filter_honors_rust_log() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(env_filter().max_level_hint(), Some(LevelFilter::INFO));

        std::env::set_var("RUST_LOG", "warn");
        assert_eq!(env_filter().max_level_hint(), Some(LevelFilter::WARN));
        std::env::remove_var("RUST_LOG");
    }

    #[test]
    fn test_slip_never_matches_first_digit() {
        for code in ["03B1", "F8FF"] {
            let expected = KeyEvent::sequence_for(code)[0];
            assert_ne!(slip(code), expected);
        }
    }
}
