//! Stage 1: guided practice followed by adaptive masked recall.

mod counter;
mod reconcile;
mod round;
mod scheduler;

pub use counter::{AdvanceReason, RoundCounter};
pub use reconcile::{ReconcileOutcome, SessionReconciler};
pub use round::{ActiveTask, Phase, RoundView, RowView, TaskKind, Transition};
pub use scheduler::{Stage1Progress, Stage1Scheduler};
