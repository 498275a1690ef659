//! Configuration system for glyphdrill.
//!
//! Three layers: numeric scheduler tuning, UI pacing delays, and the small
//! set of persisted learner preferences.

use crate::catalog::PackChoice;
use crate::error::{GlyphError, GlyphResult};
use crate::types::{OrderMode, SelectionMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Constants driving the Stage 1 scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerTuning {
    /// Visible successes a symbol needs before it is ranked for masking.
    pub min_visible_successes: u32,
    /// Weight of the posterior uncertainty bonus.
    pub uncertainty_weight: f64,
    /// Weight of the recency bonus.
    pub recency_weight: f64,
    /// Rounds after which the recency bonus saturates.
    pub recency_horizon: u32,
    /// Seed rows shown during practice.
    pub practice_rows: usize,
    /// Number of practice passes.
    pub practice_passes: u32,
    /// Row count of the first recall round.
    pub initial_recall_rows: usize,
    /// Smallest working set the scheduler accepts.
    pub min_working_set: usize,
    /// Free hidden-row errors per round.
    pub hidden_free_errors: u32,
    /// Free visible-row errors per round.
    pub visible_free_errors: u32,
    /// Masked failures that put a symbol on the remedial path.
    pub remedial_failure_threshold: u32,
    /// Hidden successes required on the remedial path.
    pub remedial_hidden_successes: u32,
    /// Hidden successes required on the standard path.
    pub standard_hidden_successes: u32,
    /// Displayed round number of the first recall round.
    pub first_recall_round: u32,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            min_visible_successes: 2,
            uncertainty_weight: 0.4,
            recency_weight: 0.1,
            recency_horizon: 4,
            practice_rows: 3,
            practice_passes: 2,
            initial_recall_rows: 4,
            min_working_set: 3,
            hidden_free_errors: 1,
            visible_free_errors: 2,
            remedial_failure_threshold: 2,
            remedial_hidden_successes: 2,
            standard_hidden_successes: 1,
            first_recall_round: 3,
        }
    }
}

/// Pacing delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub practice_advance_ms: u64,
    pub row_advance_ms: u64,
    pub interrupt_ms: u64,
    pub interrupt_floor_ms: u64,
    pub stage2_trial_ms: u64,
    pub stage2_advance_ms: u64,
    pub stage2_finish_ms: u64,
    pub reinforcement_ms: u64,
    pub challenge_flash_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            practice_advance_ms: 120,
            row_advance_ms: 600,
            interrupt_ms: 3000,
            interrupt_floor_ms: 60,
            stage2_trial_ms: 5000,
            stage2_advance_ms: 500,
            stage2_finish_ms: 800,
            reinforcement_ms: 2400,
            challenge_flash_ms: 220,
        }
    }
}

impl PacingConfig {
    pub fn practice_advance(&self) -> Duration {
        Duration::from_millis(self.practice_advance_ms)
    }

    pub fn row_advance(&self) -> Duration {
        Duration::from_millis(self.row_advance_ms)
    }

    pub fn interrupt(&self) -> Duration {
        Duration::from_millis(self.interrupt_ms)
    }

    pub fn interrupt_floor(&self) -> Duration {
        Duration::from_millis(self.interrupt_floor_ms)
    }

    pub fn stage2_trial(&self) -> Duration {
        Duration::from_millis(self.stage2_trial_ms)
    }

    pub fn stage2_advance(&self) -> Duration {
        Duration::from_millis(self.stage2_advance_ms)
    }

    pub fn stage2_finish(&self) -> Duration {
        Duration::from_millis(self.stage2_finish_ms)
    }

    pub fn reinforcement(&self) -> Duration {
        Duration::from_millis(self.reinforcement_ms)
    }

    pub fn challenge_flash(&self) -> Duration {
        Duration::from_millis(self.challenge_flash_ms)
    }
}

/// Persisted learner preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Chosen symbol pack.
    pub pack: PackChoice,
    /// Desired working set size; `None` means `min(7, pack size)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_set_size: Option<usize>,
    pub order_mode: OrderMode,
    /// Let toggled-on symbols appear mid-round instead of waiting.
    pub show_new_immediately: bool,
    pub selection_mode: SelectionMode,
    /// Enables the round-completing debug skip.
    pub debug: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            pack: PackChoice::default(),
            working_set_size: None,
            order_mode: OrderMode::default(),
            show_new_immediately: true,
            selection_mode: SelectionMode::default(),
            debug: false,
        }
    }
}

impl Preferences {
    /// Default working set size for a pack of `pack_len` distinct symbols.
    pub const DEFAULT_SET_SIZE: usize = 7;

    /// Resolved working set size for a pack.
    pub fn resolved_set_size(&self, pack_len: usize, minimum: usize) -> usize {
        self.working_set_size
            .unwrap_or_else(|| Self::DEFAULT_SET_SIZE.min(pack_len))
            .max(minimum)
            .min(pack_len.max(minimum))
    }
}

/// Main trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Path to the progress ledger database.
    pub ledger_path: PathBuf,
    pub tuning: SchedulerTuning,
    pub pacing: PacingConfig,
    pub preferences: Preferences,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".glyphdrill"))
            .unwrap_or_else(|| PathBuf::from(".glyphdrill"));

        Self {
            ledger_path: data_dir.join("progress.db"),
            tuning: SchedulerTuning::default(),
            pacing: PacingConfig::default(),
            preferences: Preferences::default(),
        }
    }
}

impl TrainerConfig {
    /// Create a new builder.
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder::new()
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> GlyphResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = match Self::extension(path.as_ref()) {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GlyphError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GlyphError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GlyphError::Configuration(e.to_string()))?,
            _ => {
                return Err(GlyphError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Write configuration back to a file, format chosen by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> GlyphResult<()> {
        let content = match Self::extension(path.as_ref()) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| GlyphError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => {
                serde_yaml::to_string(self).map_err(|e| GlyphError::Configuration(e.to_string()))?
            }
            _ => {
                return Err(GlyphError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// - `GLYPHDRILL_PACK` (e.g. `basic-greek`, `all`)
    /// - `GLYPHDRILL_SET_SIZE`
    /// - `GLYPHDRILL_ORDER` (`random` or `sequential`)
    /// - `GLYPHDRILL_SHOW_NEW` (`true`/`false`)
    /// - `GLYPHDRILL_SELECTION` (`weak` or `adversarial`)
    /// - `GLYPHDRILL_LEDGER_PATH`
    /// - `GLYPHDRILL_DEBUG`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let prefs = &mut config.preferences;

        if let Some(pack) = env_parse::<PackChoice>("GLYPHDRILL_PACK") {
            prefs.pack = pack;
        }
        if let Some(size) = env_parse::<usize>("GLYPHDRILL_SET_SIZE") {
            prefs.working_set_size = Some(size);
        }
        if let Some(order) = env_parse::<OrderMode>("GLYPHDRILL_ORDER") {
            prefs.order_mode = order;
        }
        if let Some(show) = env_parse::<bool>("GLYPHDRILL_SHOW_NEW") {
            prefs.show_new_immediately = show;
        }
        if let Some(mode) = env_parse::<SelectionMode>("GLYPHDRILL_SELECTION") {
            prefs.selection_mode = mode;
        }
        if let Some(debug) = env_parse::<bool>("GLYPHDRILL_DEBUG") {
            prefs.debug = debug;
        }
        if let Ok(path) = std::env::var("GLYPHDRILL_LEDGER_PATH") {
            config.ledger_path = PathBuf::from(path);
        }

        config
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> GlyphResult<()> {
        let t = &self.tuning;
        if t.min_working_set < 3 {
            return Err(GlyphError::validation_with_suggestion(
                format!("min_working_set must be at least 3, got {}", t.min_working_set),
                "Set tuning.min_working_set to 3 or more",
            ));
        }
        if t.practice_rows == 0 || t.practice_rows > t.min_working_set {
            return Err(GlyphError::validation(format!(
                "practice_rows must be between 1 and min_working_set ({}), got {}",
                t.min_working_set, t.practice_rows
            )));
        }
        if t.practice_passes == 0 {
            return Err(GlyphError::validation("practice_passes must be at least 1"));
        }
        if t.recency_horizon == 0 {
            return Err(GlyphError::validation("recency_horizon must be at least 1"));
        }
        if t.uncertainty_weight < 0.0 || t.recency_weight < 0.0 {
            return Err(GlyphError::validation("selection weights must be non-negative"));
        }
        if let Some(size) = self.preferences.working_set_size {
            if size < t.min_working_set {
                return Err(GlyphError::set_too_small(size, t.min_working_set));
            }
        }
        Ok(())
    }

    fn extension(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default)]
pub struct TrainerConfigBuilder {
    config: TrainerConfig,
}

impl TrainerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tuning(mut self, tuning: SchedulerTuning) -> Self {
        self.config.tuning = tuning;
        self
    }

    pub fn pacing(mut self, pacing: PacingConfig) -> Self {
        self.config.pacing = pacing;
        self
    }

    pub fn pack(mut self, pack: PackChoice) -> Self {
        self.config.preferences.pack = pack;
        self
    }

    pub fn working_set_size(mut self, size: usize) -> Self {
        self.config.preferences.working_set_size = Some(size);
        self
    }

    pub fn order_mode(mut self, order: OrderMode) -> Self {
        self.config.preferences.order_mode = order;
        self
    }

    pub fn show_new_immediately(mut self, show: bool) -> Self {
        self.config.preferences.show_new_immediately = show;
        self
    }

    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.config.preferences.selection_mode = mode;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.preferences.debug = debug;
        self
    }

    pub fn ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ledger_path = path.into();
        self
    }

    /// Validate and build.
    pub fn build(self) -> GlyphResult<TrainerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainerConfig::default();
        assert_eq!(config.tuning.min_visible_successes, 2);
        assert_eq!(config.tuning.uncertainty_weight, 0.4);
        assert_eq!(config.pacing.row_advance(), Duration::from_millis(600));
        assert!(config.preferences.show_new_immediately);
        assert!(config.ledger_path.ends_with("progress.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolved_set_size() {
        let prefs = Preferences::default();
        assert_eq!(prefs.resolved_set_size(21, 3), 7);
        assert_eq!(prefs.resolved_set_size(5, 3), 5);

        let prefs = Preferences {
            working_set_size: Some(30),
            ..Default::default()
        };
        assert_eq!(prefs.resolved_set_size(8, 3), 8);
    }

    #[test]
    fn test_builder_rejects_small_set() {
        let err = TrainerConfig::builder().working_set_size(2).build().unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ValSetTooSmall);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyphdrill.toml");
        let config = TrainerConfig::builder()
            .pack(PackChoice::Statistics)
            .order_mode(OrderMode::Sequential)
            .show_new_immediately(false)
            .ledger_path(dir.path().join("ledger.db"))
            .build()
            .unwrap();
        config.save(&path).unwrap();

        let loaded = TrainerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yaml");
        std::fs::write(&path, "preferences:\n  pack: logic-and-sets\n  order_mode: sequential\n").unwrap();

        let loaded = TrainerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.preferences.pack, PackChoice::LogicAndSets);
        assert_eq!(loaded.preferences.order_mode, OrderMode::Sequential);
        assert_eq!(loaded.tuning, SchedulerTuning::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            TrainerConfig::from_file(&path),
            Err(GlyphError::Configuration(_))
        ));
    }
}
