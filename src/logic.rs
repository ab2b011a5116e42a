//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Composing a test from the current bank (plain or adaptive)
//!   - Re-validating a test a client sends back
//!   - Recording attempts and reading the recomputed profile

use tracing::{info, instrument, warn};

use crate::compose::{compose_adaptive_test, compose_test};
use crate::domain::{AttemptRecord, ComposedTest, CompositionConfig};
use crate::error::{ComposeError, ComposeResult};
use crate::protocol::AttemptsOut;
use crate::state::AppState;
use crate::validation::{validate, ValidationReport};

/// A fresh seed when the caller does not pin one.
fn seed_or_random(seed: Option<u64>) -> u64 {
  seed.unwrap_or_else(rand::random)
}

/// Gating and sequencing are CPU-bound; keep them off the async workers.
async fn off_runtime<F>(job: F) -> ComposeResult<ComposedTest>
where
  F: FnOnce() -> ComposeResult<ComposedTest> + Send + 'static,
{
  tokio::task::spawn_blocking(job)
    .await
    .map_err(|e| ComposeError::Internal(format!("composition task failed: {e}")))?
}

#[instrument(level = "info", skip(state, config), fields(custom_config = config.is_some()))]
pub async fn compose(state: &AppState, config: Option<CompositionConfig>, seed: Option<u64>) -> ComposeResult<ComposedTest> {
  let config = config.unwrap_or_else(|| state.default_composition.clone());
  let seed = seed_or_random(seed);
  let pool = state.pool().await;
  let settings = state.settings.clone();
  let result = off_runtime(move || compose_test(&pool, &config, &settings, seed)).await;
  match &result {
    Ok(t) => info!(target: "composer", seed, items = t.len(), valid = t.report.valid, "Test composed"),
    Err(e) => warn!(target: "composer", seed, code = e.code(), error = %e, "Composition failed"),
  }
  result
}

#[instrument(level = "info", skip(state, config), fields(%learner_id, custom_config = config.is_some()))]
pub async fn compose_adaptive(
  state: &AppState,
  learner_id: &str,
  config: Option<CompositionConfig>,
  seed: Option<u64>,
) -> ComposeResult<ComposedTest> {
  let config = config.unwrap_or_else(|| state.default_composition.clone());
  let seed = seed_or_random(seed);
  let profile = state.profile(learner_id).await;
  let pool = state.pool().await;
  let settings = state.settings.clone();
  let weak = profile.weak_areas.len();
  let result = off_runtime(move || compose_adaptive_test(&pool, &profile, &config, &settings, seed)).await;
  match &result {
    Ok(t) => info!(target: "composer", %learner_id, seed, weak, items = t.len(), "Adaptive test composed"),
    Err(e) => warn!(target: "composer", %learner_id, seed, code = e.code(), error = %e, "Adaptive composition failed"),
  }
  result
}

#[instrument(level = "info", skip_all, fields(items = test.len()))]
pub fn revalidate(test: &ComposedTest) -> ValidationReport {
  let report = validate(test);
  info!(target: "composer", valid = report.valid, violations = report.violations.len(), "Test revalidated");
  report
}

#[instrument(level = "info", skip(state, attempts), fields(%learner_id, n = attempts.len()))]
pub async fn submit_attempts(state: &AppState, learner_id: &str, attempts: Vec<AttemptRecord>) -> AttemptsOut {
  let recorded = attempts.len();
  let total = state.record_attempts(learner_id, attempts).await;
  AttemptsOut { learner_id: learner_id.to_string(), recorded, total }
}
