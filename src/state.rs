//! Application state: in-memory item bank, attempt log, and engine settings.
//!
//! This module owns:
//!   - the assessed question bank (config items first, then built-in seeds)
//!   - the per-learner attempt log
//!   - engine settings and the default composition (from TOML or defaults)
//!   - the compiled assessor used for new items

use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::assess::{AssessedItem, Assessor};
use crate::bank::{AttemptLog, InMemoryAttemptLog, InMemoryBank, ItemBank, ItemQuery};
use crate::config::{load_engine_config_from_env, EngineConfig, EngineSettings};
use crate::domain::{AttemptRecord, CandidateItem, CompositionConfig, DifficultyLabel, ItemDraft, Subject};
use crate::error::ComposeError;
use crate::profile::LearnerProfile;
use crate::seeds::seed_drafts;

#[derive(Clone)]
pub struct AppState {
  pub bank: Arc<RwLock<InMemoryBank>>,
  pub attempts: Arc<RwLock<InMemoryAttemptLog>>,
  pub settings: EngineSettings,
  pub default_composition: CompositionConfig,
  assessor: Arc<Assessor>,
}

impl AppState {
  /// Build state from env: load config, assess config items and seeds, log inventory.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Result<Self, ComposeError> {
    Self::from_config(load_engine_config_from_env().unwrap_or_default())
  }

  #[instrument(level = "info", skip_all, fields(config_items = cfg.items.len()))]
  pub fn from_config(cfg: EngineConfig) -> Result<Self, ComposeError> {
    let settings = cfg.engine.clone();
    let assessor = Assessor::new(&settings)?;

    let mut drafts: Vec<ItemDraft> = cfg
      .items
      .iter()
      .cloned()
      .map(|mut d| {
        if d.id.trim().is_empty() {
          d.id = Uuid::new_v4().to_string();
        }
        d
      })
      .collect();
    // Built-in seeds never overwrite config items with the same id.
    let configured: std::collections::HashSet<String> = drafts.iter().map(|d| d.id.clone()).collect();
    drafts.extend(seed_drafts().into_iter().filter(|d| !configured.contains(&d.id)));

    let assessed = assessor.prepare_pool(&drafts);
    let rejected: Vec<&str> = assessed.iter().filter(|a| !a.verdict.passed).map(|a| a.item.id.as_str()).collect();
    if !rejected.is_empty() {
      warn!(target: "examforge_backend", count = rejected.len(), ids = ?rejected, "Bank items below the quality gate; kept but never composed");
    }
    let bank: InMemoryBank = assessed.into_iter().map(|a| a.item).collect();
    log_inventory(&bank);

    Ok(Self {
      bank: Arc::new(RwLock::new(bank)),
      attempts: Arc::new(RwLock::new(InMemoryAttemptLog::default())),
      default_composition: cfg.default_composition(),
      settings,
      assessor: Arc::new(assessor),
    })
  }

  /// Score and gate a draft, then store the item whatever the verdict.
  #[instrument(level = "debug", skip(self, draft), fields(id = %draft.id))]
  pub async fn insert_draft(&self, mut draft: ItemDraft) -> AssessedItem {
    if draft.id.trim().is_empty() {
      draft.id = Uuid::new_v4().to_string();
    }
    let assessed = self.assessor.prepare_item(&draft);
    let fresh = self.bank.write().await.upsert(assessed.item.clone());
    info!(
      target: "examforge_backend",
      id = %assessed.item.id,
      fresh,
      passed = assessed.verdict.passed,
      quality = assessed.verdict.quality_score,
      "Item stored"
    );
    assessed
  }

  pub async fn items(&self, query: &ItemQuery) -> Vec<CandidateItem> {
    self.bank.read().await.items(query)
  }

  pub async fn pool(&self) -> Vec<CandidateItem> {
    self.items(&ItemQuery::default()).await
  }

  #[instrument(level = "debug", skip(self, records), fields(%learner_id, n = records.len()))]
  pub async fn record_attempts(&self, learner_id: &str, records: Vec<AttemptRecord>) -> usize {
    self.attempts.write().await.append(learner_id, records)
  }

  /// Profile recomputed from the full history on every call.
  pub async fn profile(&self, learner_id: &str) -> LearnerProfile {
    let history = self.attempts.read().await.history(learner_id);
    LearnerProfile::from_attempts(&history, &self.settings.adaptive)
  }
}

fn log_inventory(bank: &InMemoryBank) {
  let mut counts: BTreeMap<Subject, [usize; 3]> = BTreeMap::new();
  for item in bank.items(&ItemQuery::default()) {
    let slot = match item.difficulty_label {
      DifficultyLabel::Easy => 0,
      DifficultyLabel::Medium => 1,
      DifficultyLabel::Hard => 2,
    };
    counts.entry(item.subject).or_default()[slot] += 1;
  }
  for (subject, [easy, medium, hard]) in counts {
    info!(target: "examforge_backend", %subject, easy, medium, hard, "Startup item inventory");
  }
}
