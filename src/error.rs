//! Structured failures of the composition pipeline and configuration loading.
//! Every variant names the bucket or rule at fault; nothing degrades silently.

use thiserror::Error;

use crate::domain::BucketKey;
use crate::validation::Violation;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ComposeError {
  #[error("quota infeasible for {bucket}: {reason}")]
  QuotaInfeasible { bucket: BucketKey, reason: String },

  #[error("insufficient pool for {bucket}: required {required}, available {available}")]
  InsufficientPool { bucket: BucketKey, required: usize, available: usize },

  #[error("sequencing did not converge: placed {placed} of {total} items after {iterations} iterations")]
  SequencingTimeout { placed: usize, total: usize, iterations: usize },

  #[error("validation failed with {} violation(s)", violations.len())]
  ValidationFailed { violations: Vec<Violation> },

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ComposeError {
  /// Stable machine-readable code for API payloads.
  pub fn code(&self) -> &'static str {
    match self {
      ComposeError::QuotaInfeasible { .. } => "quota_infeasible",
      ComposeError::InsufficientPool { .. } => "insufficient_pool",
      ComposeError::SequencingTimeout { .. } => "sequencing_timeout",
      ComposeError::ValidationFailed { .. } => "validation_failed",
      ComposeError::InvalidConfig(_) => "invalid_config",
      ComposeError::Internal(_) => "internal",
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse TOML config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid config: {0}")]
  Invalid(String),
}

pub type ComposeResult<T> = Result<T, ComposeError>;
