//! Loading engine configuration (weights, thresholds, rules, optional item bank) from TOML.
//!
//! Every knob the pipeline reads lives in `EngineSettings` and is passed into
//! each call explicitly; nothing is read from process-wide state once loaded.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::difficulty::{DifficultyScorer, ScoringWeights};
use crate::domain::{CompositionConfig, ItemDraft};
use crate::error::{ComposeError, ConfigError};
use crate::profile::AdaptiveThresholds;
use crate::quality::{GateThresholds, QualityGate};
use crate::sequencer::SequencingRules;

/// Runtime settings threaded through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
  pub scoring: ScoringWeights,
  pub gate: GateThresholds,
  pub sequencing: SequencingRules,
  pub adaptive: AdaptiveThresholds,
}

impl EngineSettings {
  /// Check every section and compile the gate's rule table once.
  pub fn validate(&self) -> Result<(), ComposeError> {
    DifficultyScorer::new(self.scoring)?;
    QualityGate::new(self.gate.clone())?;
    self.sequencing.validate()?;
    self.adaptive.validate()?;
    Ok(())
  }

  pub fn passing_score(&self) -> f64 {
    self.gate.passing_score
  }
}

/// Top-level TOML document.
///
/// ```toml
/// [engine.scoring]
/// cognitive_level = 0.20
///
/// [engine.gate]
/// passing_score = 70.0
///
/// [composition]
/// target_size = 100
/// subject_constraints = [{ dimension = { kind = "subject", value = "polity" }, min_count = 17, max_count = 22 }]
///
/// [[items]]
/// id = "q-001"
/// subject = "history"
/// ...
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EngineConfig {
  #[serde(default)]
  pub engine: EngineSettings,
  /// Default composition used when a request does not carry one.
  #[serde(default)]
  pub composition: Option<CompositionConfig>,
  /// Optional local item bank, assessed at startup.
  #[serde(default)]
  pub items: Vec<ItemDraft>,
}

impl EngineConfig {
  pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
    let cfg: EngineConfig = toml::from_str(s)?;
    cfg.engine.validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;
    if let Some(c) = &cfg.composition {
      if c.target_size == 0 {
        return Err(ConfigError::Invalid("composition.target_size must be positive".into()));
      }
    }
    Ok(cfg)
  }

  pub fn load(path: &str) -> Result<Self, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
    Self::from_toml_str(&s)
  }

  pub fn default_composition(&self) -> CompositionConfig {
    self.composition.clone().unwrap_or_default()
  }
}

/// Attempt to load `EngineConfig` from ENGINE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("ENGINE_CONFIG_PATH").ok()?;
  match EngineConfig::load(&path) {
    Ok(cfg) => {
      info!(target: "examforge_backend", %path, items = cfg.items.len(), "Loaded engine config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "examforge_backend", %path, error = %e, "Failed to load engine config");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Subject;

  #[test]
  fn empty_document_yields_defaults() {
    let cfg = EngineConfig::from_toml_str("").expect("parse");
    assert_eq!(cfg.engine, EngineSettings::default());
    assert!(cfg.items.is_empty());
    assert_eq!(cfg.default_composition().target_size, 100);
  }

  #[test]
  fn partial_sections_override_defaults() {
    let doc = r#"
      [engine.gate]
      passing_score = 75.0

      [engine.sequencing]
      max_subject_run = 3

      [composition]
      target_size = 10
      subject_constraints = [
        { dimension = { kind = "subject", value = "polity" }, min_count = 4, max_count = 6 },
        { dimension = { kind = "subject", value = "history" }, min_count = 4, max_count = 6 },
      ]

      [[items]]
      id = "q-1"
      subject = "history"
      topic = "revolt of 1857"
      format = "single_correct"
      concept_tags = ["revolt"]
      raw_difficulty_score = 30.0
    "#;
    let cfg = EngineConfig::from_toml_str(doc).expect("parse");
    assert_eq!(cfg.engine.gate.passing_score, 75.0);
    assert_eq!(cfg.engine.gate.difficulty_tolerance, 20.0);
    assert_eq!(cfg.engine.sequencing.max_subject_run, 3);
    let comp = cfg.default_composition();
    assert_eq!(comp.target_size, 10);
    assert_eq!(comp.subject_constraints.len(), 2);
    assert_eq!(comp.constraint_for(Subject::History).map(|c| c.min_count), Some(4));
    assert_eq!(cfg.items[0].subject, Subject::History);
  }

  #[test]
  fn invalid_weights_are_rejected() {
    let doc = r#"
      [engine.scoring]
      cognitive_level = 0.9
    "#;
    assert!(matches!(EngineConfig::from_toml_str(doc), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn malformed_toml_is_a_parse_error() {
    assert!(matches!(EngineConfig::from_toml_str("[engine"), Err(ConfigError::Parse(_))));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    assert!(matches!(EngineConfig::load("/nonexistent/examforge.toml"), Err(ConfigError::Io { .. })));
  }
}
