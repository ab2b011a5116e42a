//! Turning bank drafts into `CandidateItem`s and gating a pool before composition.
//!
//! Scoring and gating are pure per-item functions, so whole pools are
//! processed in parallel with rayon; output order always matches input order.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::EngineSettings;
use crate::difficulty::{DifficultyAssessment, DifficultyScorer, ScoringInput};
use crate::domain::{CandidateItem, DifficultyLabel, ItemDraft};
use crate::error::{ComposeError, ComposeResult};
use crate::quality::{has_trap_marker, GateInput, GateVerdict, QualityGate, SourceFacts};

/// Scorer and gate built once from settings.
#[derive(Debug)]
pub struct Assessor {
  scorer: DifficultyScorer,
  gate: QualityGate,
}

/// Draft after scoring and gating, with the evidence kept for callers.
#[derive(Clone, Debug, Serialize)]
pub struct AssessedItem {
  pub item: CandidateItem,
  pub verdict: GateVerdict,
  /// Present when the score was computed rather than supplied by the bank.
  pub difficulty: Option<DifficultyAssessment>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rejection {
  pub id: String,
  pub quality_score: f64,
  pub reasons: Vec<String>,
}

/// Pool after the gate: admitted items (borrowed, original order) and the rest.
#[derive(Debug, Default)]
pub struct GatedPool<'a> {
  pub admitted: Vec<&'a CandidateItem>,
  pub rejected: Vec<Rejection>,
}

impl Assessor {
  pub fn new(settings: &EngineSettings) -> Result<Self, ComposeError> {
    Ok(Self { scorer: DifficultyScorer::new(settings.scoring)?, gate: QualityGate::new(settings.gate.clone())? })
  }

  pub fn gate(&self) -> &QualityGate {
    &self.gate
  }

  pub fn scorer(&self) -> &DifficultyScorer {
    &self.scorer
  }

  /// Score (when needed), label, trap-flag and gate one draft.
  pub fn prepare_item(&self, draft: &ItemDraft) -> AssessedItem {
    let (raw, difficulty) = match draft.raw_difficulty_score {
      Some(score) => (score.clamp(0.0, 100.0), None),
      None => {
        let input = ScoringInput {
          subject: draft.subject,
          format: draft.format,
          concept_tags: &draft.concept_tags,
          content: draft.content.as_ref(),
        };
        let a = self.scorer.assess(&input);
        (a.score, Some(a))
      }
    };
    let label = DifficultyLabel::from_score(raw);
    let is_trap = draft
      .is_trap
      .unwrap_or_else(|| draft.format.is_trap_prone() && draft.content.as_ref().map_or(false, has_trap_marker));

    let facts = SourceFacts { facts: draft.source_facts.clone() };
    let verdict = self.gate.evaluate(
      &GateInput {
        subject: draft.subject,
        topic: &draft.topic,
        format: draft.format,
        concept_tags: &draft.concept_tags,
        declared_label: label,
        content: draft.content.as_ref(),
      },
      Some(&facts),
    );

    let item = CandidateItem {
      id: draft.id.clone(),
      subject: draft.subject,
      topic: draft.topic.clone(),
      format: draft.format,
      raw_difficulty_score: raw,
      difficulty_label: label,
      concept_tags: draft.concept_tags.clone(),
      quality_score: verdict.quality_score,
      is_trap,
      content: draft.content.clone(),
    };
    AssessedItem { item, verdict, difficulty }
  }

  #[instrument(level = "info", skip_all, fields(drafts = drafts.len()))]
  pub fn prepare_pool(&self, drafts: &[ItemDraft]) -> Vec<AssessedItem> {
    let assessed: Vec<AssessedItem> = drafts.par_iter().map(|d| self.prepare_item(d)).collect();
    let passed = assessed.iter().filter(|a| a.verdict.passed).count();
    info!(target: "gate", total = assessed.len(), passed, rejected = assessed.len() - passed, "Pool assessed");
    assessed
  }

  /// Admit only items whose recorded score passes and whose fresh gate run
  /// passes too; an item never slips through on a stale score.
  #[instrument(level = "debug", skip_all, fields(pool = pool.len()))]
  pub fn filter_pool<'a>(&self, pool: &'a [CandidateItem]) -> GatedPool<'a> {
    let threshold = self.gate.thresholds().passing_score;
    let verdicts: Vec<(GateVerdict, bool)> = pool
      .par_iter()
      .map(|item| (self.gate.evaluate(&GateInput::from(item), None), item.label_is_consistent()))
      .collect();

    let mut out = GatedPool::default();
    for (item, (verdict, consistent)) in pool.iter().zip(verdicts) {
      let mut reasons: Vec<String> = vec![];
      if item.quality_score < threshold {
        reasons.push(format!("recorded quality {:.0} below {threshold:.0}", item.quality_score));
      }
      if !verdict.passed {
        reasons.extend(verdict.findings.iter().map(|f| f.rule_id.clone()));
      }
      if !consistent {
        reasons.push(format!("label {} inconsistent with score {:.0}", item.difficulty_label, item.raw_difficulty_score));
      }
      if reasons.is_empty() {
        out.admitted.push(item);
      } else {
        out.rejected.push(Rejection { id: item.id.clone(), quality_score: item.quality_score.min(verdict.quality_score), reasons });
      }
    }
    out
  }
}

/// Assess a batch of drafts with fresh settings, keeping only the candidates.
pub fn prepare_pool(drafts: &[ItemDraft], settings: &EngineSettings) -> ComposeResult<Vec<CandidateItem>> {
  let assessor = Assessor::new(settings)?;
  Ok(assessor.prepare_pool(drafts).into_iter().map(|a| a.item).collect())
}
