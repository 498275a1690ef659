//! glyphdrill-core - Core library for glyphdrill.
//!
//! This crate provides the symbol catalog, per-symbol recall statistics,
//! the adaptive Stage 1 scheduler and the Stage 2 recall drill for a
//! trainer that teaches 4-digit Unicode input codes.
//!
//! # Example
//!
//! ```ignore
//! use glyphdrill_core::{InMemoryLedger, KeyEvent, TracingInterrupt, TracingSink, TrainerConfig, TrainerSession};
//!
//! let config = TrainerConfig::default();
//! let mut session = TrainerSession::new(
//!     config,
//!     Arc::new(InMemoryLedger::new()),
//!     TracingSink,
//!     TracingInterrupt,
//!     StdRng::from_entropy(),
//! )?;
//! session.start();
//!
//! // Alt held, then the four digits of the highlighted row
//! session.handle_key(now, KeyEvent::ModifierDown)?;
//! for key in KeyEvent::sequence_for("03B1") {
//!     session.handle_key(now, key)?;
//! }
//!
//! // Fire pacing delays as the clock moves
//! session.advance_to(now + Duration::from_millis(600))?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod feedback;
pub mod ledger;
pub mod selection;
pub mod session;
pub mod stage1;
pub mod stage2;
pub mod stats;
pub mod timeline;
pub mod types;
pub mod working_set;

// Re-export commonly used types
pub use catalog::{normalize_code, PackChoice, Symbol, SymbolCatalog, SymbolPack};
pub use config::{PacingConfig, Preferences, SchedulerTuning, TrainerConfig};
pub use error::{ErrorCode, GlyphError, GlyphResult};
pub use feedback::{
    FeedbackEvent, FeedbackSink, Hooks, PatternInterrupt, RecordingInterrupt, RecordingSink,
    TracingInterrupt, TracingSink,
};
pub use ledger::{InMemoryLedger, ProgressLedger, SqliteLedger};
pub use selection::{HiddenBatchSelector, SelectionContext, SelectionWeights};
pub use session::{Stage, TrainerSession};
pub use stage1::{
    ActiveTask, AdvanceReason, Phase, ReconcileOutcome, RoundCounter, RoundView, RowView,
    SessionReconciler, Stage1Progress, Stage1Scheduler, TaskKind, Transition,
};
pub use stage2::{
    DrillState, ReinforcementCadence, Stage2Handoff, Stage2Session, Stage2View, REQUIRED_RECALLS,
};
pub use stats::{ItemStat, ItemStatsTracker, PromotionQuota};
pub use timeline::{Timeline, Token};
pub use types::{HexDigit, KeyEvent, OrderMode, SelectionMode, StageKind};
pub use working_set::{WorkingSet, WorkingSetBuilder};
