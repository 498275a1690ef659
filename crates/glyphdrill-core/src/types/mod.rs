//! Shared enums and value types.

mod input;

pub use input::{HexDigit, KeyEvent};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the working set is ordered and whether queues are shuffled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    /// Baseline sorted by code; rows and queues shuffled.
    #[default]
    Random,
    /// Catalog order everywhere.
    Sequential,
}

impl OrderMode {
    pub fn is_random(self) -> bool {
        matches!(self, Self::Random)
    }
}

/// Scoring direction for hidden-batch selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Mask the symbols the learner is weakest on.
    #[default]
    Weak,
    /// Mask the symbols the learner is strongest on.
    Adversarial,
}

impl SelectionMode {
    /// Sign applied to the posterior mean in the batch score.
    pub fn theta_sign(self) -> f64 {
        match self {
            Self::Weak => -1.0,
            Self::Adversarial => 1.0,
        }
    }
}

/// Which stage a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Stage1,
    Stage2,
    /// Stage 2 complete; the recognition quiz takes over outside this crate.
    Finished,
}
