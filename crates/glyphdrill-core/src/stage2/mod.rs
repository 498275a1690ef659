//! Stage 2: the timed recall drill and the hand-off into it.

mod drill;
mod handoff;

pub use drill::{
    hint_string, DrillState, ReinforcementCadence, Stage2Session, Stage2View, MAX_HINT_LEVEL,
};
pub use handoff::{Stage2Handoff, REQUIRED_RECALLS};
