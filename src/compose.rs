//! Composition pipeline: gate → allocate → select → sequence → validate.

use tracing::{info, instrument, warn};

use crate::assess::Assessor;
use crate::config::EngineSettings;
use crate::domain::{CandidateItem, ComposedTest, CompositionConfig};
use crate::error::{ComposeError, ComposeResult};
use crate::profile::LearnerProfile;
use crate::validation::{audit, Audit, ValidationReport};
use crate::{quota, selector, sequencer};

/// Build one test from `pool`. Same pool, config, settings and seed give the
/// same test.
#[instrument(level = "info", skip_all, fields(pool = pool.len(), target = config.target_size, seed = seed))]
pub fn compose_test(pool: &[CandidateItem], config: &CompositionConfig, settings: &EngineSettings, seed: u64) -> ComposeResult<ComposedTest> {
  run(pool, config.clone(), settings, seed, None)
}

/// Like `compose_test`, with quotas biased toward the learner's weak
/// subjects and positions steered along their difficulty curve.
#[instrument(level = "info", skip_all, fields(pool = pool.len(), target = config.target_size, seed = seed, weak = profile.weak_areas.len()))]
pub fn compose_adaptive_test(
  pool: &[CandidateItem],
  profile: &LearnerProfile,
  config: &CompositionConfig,
  settings: &EngineSettings,
  seed: u64,
) -> ComposeResult<ComposedTest> {
  settings.adaptive.validate()?;
  let biased = profile.bias_config(config, &settings.adaptive)?;
  run(pool, biased, settings, seed, Some(profile))
}

fn run(
  pool: &[CandidateItem],
  config: CompositionConfig,
  settings: &EngineSettings,
  seed: u64,
  profile: Option<&LearnerProfile>,
) -> ComposeResult<ComposedTest> {
  let assessor = Assessor::new(settings)?;
  let gated = assessor.filter_pool(pool);
  if !gated.rejected.is_empty() {
    info!(target: "composer", admitted = gated.admitted.len(), rejected = gated.rejected.len(), "Gate excluded items");
  }

  let plan = quota::allocate(&config)?;
  let curve = profile.map(|p| p.difficulty_curve(&plan, &settings.adaptive));
  let selection = selector::select(&gated.admitted, &plan, &config, seed)?;
  let sequenced = sequencer::sequence(&selection.items, &settings.sequencing, curve.as_deref())?;

  let passing_score = settings.passing_score();
  let report = audit(&Audit {
    items: &sequenced.items,
    plan: &plan,
    config: &config,
    rules: &settings.sequencing,
    passing_score,
    relaxations: &sequenced.relaxations,
  });
  let report = accept(report, config.best_effort)?;

  info!(
    target: "composer",
    items = sequenced.items.len(),
    traps = selection.trap_count,
    concepts = selection.covered_tags,
    relaxed = sequenced.relaxations.len(),
    "Composed test"
  );
  Ok(ComposedTest {
    items: sequenced.items,
    plan,
    config,
    rules: settings.sequencing.clone(),
    passing_score,
    relaxations: sequenced.relaxations,
    seed,
    report,
  })
}

/// An invalid report is an error unless the caller asked for best effort,
/// in which case the test is returned flagged.
fn accept(report: ValidationReport, best_effort: bool) -> ComposeResult<ValidationReport> {
  if report.valid {
    return Ok(report);
  }
  if !best_effort {
    warn!(target: "composer", violations = report.violations.len(), "Composed test failed validation");
    return Err(ComposeError::ValidationFailed { violations: report.violations });
  }
  warn!(target: "composer", violations = report.violations.len(), "Returning invalid test in best-effort mode");
  Ok(report)
}
