//! Domain models used by the engine: subjects, formats, difficulty labels,
//! candidate items, buckets, plans, composed tests and learner attempts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationReport;

/// Score at or below which an item is `easy`.
pub const EASY_MAX_SCORE: f64 = 35.0;
/// Score at or below which an item is `medium`; above is `hard`.
pub const MEDIUM_MAX_SCORE: f64 = 70.0;

/// Syllabus area an item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
  Polity,
  History,
  Geography,
  Economy,
  Environment,
  Science,
  CurrentAffairs,
}

impl Subject {
  pub const ALL: [Subject; 7] = [
    Subject::Polity,
    Subject::History,
    Subject::Geography,
    Subject::Economy,
    Subject::Environment,
    Subject::Science,
    Subject::CurrentAffairs,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Subject::Polity => "polity",
      Subject::History => "history",
      Subject::Geography => "geography",
      Subject::Economy => "economy",
      Subject::Environment => "environment",
      Subject::Science => "science",
      Subject::CurrentAffairs => "current_affairs",
    }
  }

  /// Lenient lookup used for concept-tag prefixes ("polity:preamble").
  pub fn from_tag_prefix(prefix: &str) -> Option<Subject> {
    let norm = prefix.trim().to_lowercase().replace(['-', ' '], "_");
    Subject::ALL.iter().copied().find(|s| s.as_str() == norm || (norm == "ca" && *s == Subject::CurrentAffairs))
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Structural shape of a question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFormat {
  SingleCorrect,
  MultipleCorrect,
  MatchPairs,
  AssertionReason,
  StatementBased,
  Sequence,
  OddOneOut,
  CaseStudy,
  MapBased,
  DataBased,
}

impl ItemFormat {
  pub const ALL: [ItemFormat; 10] = [
    ItemFormat::SingleCorrect,
    ItemFormat::MultipleCorrect,
    ItemFormat::MatchPairs,
    ItemFormat::AssertionReason,
    ItemFormat::StatementBased,
    ItemFormat::Sequence,
    ItemFormat::OddOneOut,
    ItemFormat::CaseStudy,
    ItemFormat::MapBased,
    ItemFormat::DataBased,
  ];

  /// Formats built from a numbered list of statements. Long runs of these
  /// read as the same question over and over.
  pub fn is_statement_structured(&self) -> bool {
    matches!(self, ItemFormat::StatementBased | ItemFormat::MultipleCorrect | ItemFormat::AssertionReason)
  }

  /// Formats whose stem must carry statements, pairs or a list to order.
  pub fn requires_statements(&self) -> bool {
    matches!(
      self,
      ItemFormat::StatementBased
        | ItemFormat::MultipleCorrect
        | ItemFormat::AssertionReason
        | ItemFormat::MatchPairs
        | ItemFormat::Sequence
    )
  }

  /// Formats where a deliberately misleading option is part of the design.
  pub fn is_trap_prone(&self) -> bool {
    matches!(
      self,
      ItemFormat::MultipleCorrect | ItemFormat::StatementBased | ItemFormat::AssertionReason | ItemFormat::OddOneOut
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ItemFormat::SingleCorrect => "single_correct",
      ItemFormat::MultipleCorrect => "multiple_correct",
      ItemFormat::MatchPairs => "match_pairs",
      ItemFormat::AssertionReason => "assertion_reason",
      ItemFormat::StatementBased => "statement_based",
      ItemFormat::Sequence => "sequence",
      ItemFormat::OddOneOut => "odd_one_out",
      ItemFormat::CaseStudy => "case_study",
      ItemFormat::MapBased => "map_based",
      ItemFormat::DataBased => "data_based",
    }
  }
}

impl fmt::Display for ItemFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLabel {
  Easy,
  Medium,
  Hard,
}

impl DifficultyLabel {
  pub const ALL: [DifficultyLabel; 3] = [DifficultyLabel::Easy, DifficultyLabel::Medium, DifficultyLabel::Hard];

  /// Fixed thresholds: ≤35 easy, ≤70 medium, else hard.
  pub fn from_score(score: f64) -> DifficultyLabel {
    if score <= EASY_MAX_SCORE {
      DifficultyLabel::Easy
    } else if score <= MEDIUM_MAX_SCORE {
      DifficultyLabel::Medium
    } else {
      DifficultyLabel::Hard
    }
  }

  /// Inclusive score band the label covers.
  pub fn band(&self) -> (f64, f64) {
    match self {
      DifficultyLabel::Easy => (0.0, EASY_MAX_SCORE),
      DifficultyLabel::Medium => (EASY_MAX_SCORE, MEDIUM_MAX_SCORE),
      DifficultyLabel::Hard => (MEDIUM_MAX_SCORE, 100.0),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      DifficultyLabel::Easy => "easy",
      DifficultyLabel::Medium => "medium",
      DifficultyLabel::Hard => "hard",
    }
  }
}

impl fmt::Display for DifficultyLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Question body as stored in the bank. Text generation happens elsewhere;
/// the engine only inspects it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemContent {
  pub stem: String,
  #[serde(default)] pub statements: Vec<String>,
  #[serde(default)] pub options: Vec<String>,
  /// Zero-based indices into `options`.
  #[serde(default)] pub correct_options: Vec<usize>,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub expected_solve_secs: Option<u32>,
}

impl ItemContent {
  /// Stem, statements and options joined for text heuristics.
  pub fn full_text(&self) -> String {
    let mut parts: Vec<&str> = vec![self.stem.as_str()];
    parts.extend(self.statements.iter().map(String::as_str));
    parts.extend(self.options.iter().map(String::as_str));
    parts.join("\n")
  }
}

/// Item as supplied by the question bank, before scoring and gating.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDraft {
  /// Left empty in config files to have one generated.
  #[serde(default)] pub id: String,
  pub subject: Subject,
  pub topic: String,
  pub format: ItemFormat,
  #[serde(default)] pub concept_tags: BTreeSet<String>,
  /// Pre-computed estimate; scored from content when absent.
  #[serde(default)] pub raw_difficulty_score: Option<f64>,
  /// Overrides the format-derived trap heuristic when present.
  #[serde(default)] pub is_trap: Option<bool>,
  #[serde(default)] pub content: Option<ItemContent>,
  /// Reference facts the content pipeline used; checked by the quality gate.
  #[serde(default)] pub source_facts: Vec<String>,
}

/// Immutable unit offered to the engine. Built by `assess::prepare_item`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
  pub id: String,
  pub subject: Subject,
  pub topic: String,
  pub format: ItemFormat,
  pub raw_difficulty_score: f64,
  pub difficulty_label: DifficultyLabel,
  pub concept_tags: BTreeSet<String>,
  pub quality_score: f64,
  pub is_trap: bool,
  #[serde(default)] pub content: Option<ItemContent>,
}

impl CandidateItem {
  pub fn label_is_consistent(&self) -> bool {
    DifficultyLabel::from_score(self.raw_difficulty_score) == self.difficulty_label
  }
}

/// One quota dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BucketKey {
  Subject(Subject),
  Difficulty(DifficultyLabel),
  TrapItems,
}

impl fmt::Display for BucketKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BucketKey::Subject(s) => write!(f, "subject:{s}"),
      BucketKey::Difficulty(d) => write!(f, "difficulty:{d}"),
      BucketKey::TrapItems => f.write_str("trap_items"),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConstraint {
  pub dimension: BucketKey,
  pub min_count: usize,
  pub max_count: usize,
}

impl BucketConstraint {
  pub fn subject(subject: Subject, min_count: usize, max_count: usize) -> Self {
    Self { dimension: BucketKey::Subject(subject), min_count, max_count }
  }
}

/// Easy/medium/hard shares of the target size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRatio {
  pub easy: f64,
  pub medium: f64,
  pub hard: f64,
}

impl DifficultyRatio {
  pub fn share(&self, label: DifficultyLabel) -> f64 {
    match label {
      DifficultyLabel::Easy => self.easy,
      DifficultyLabel::Medium => self.medium,
      DifficultyLabel::Hard => self.hard,
    }
  }
}

impl Default for DifficultyRatio {
  fn default() -> Self {
    Self { easy: 0.25, medium: 0.55, hard: 0.20 }
  }
}

/// Accepted share of trap items in a composed test, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrapRatioRange {
  pub min: f64,
  pub max: f64,
}

impl Default for TrapRatioRange {
  fn default() -> Self {
    Self { min: 0.08, max: 0.12 }
  }
}

/// Prelims subject ranges for a 100-item paper.
const PRELIMS_RANGES: [(Subject, usize, usize); 7] = [
  (Subject::Polity, 17, 22),
  (Subject::History, 15, 18),
  (Subject::Geography, 12, 15),
  (Subject::Economy, 13, 17),
  (Subject::Environment, 10, 12),
  (Subject::Science, 7, 10),
  (Subject::CurrentAffairs, 22, 27),
];

/// Everything a single composition request needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositionConfig {
  pub target_size: usize,
  pub subject_constraints: Vec<BucketConstraint>,
  #[serde(default)] pub difficulty_ratio: DifficultyRatio,
  #[serde(default)] pub trap_ratio_range: TrapRatioRange,
  /// Return a flagged, invalid test instead of failing validation.
  #[serde(default)] pub best_effort: bool,
}

impl CompositionConfig {
  /// Prelims-style paper. Ranges are scaled from the 100-item pattern,
  /// mins rounded down and maxes rounded up so scaling never makes the
  /// constraints tighter than the original.
  pub fn prelims(target_size: usize) -> Self {
    let subject_constraints = PRELIMS_RANGES
      .iter()
      .map(|(subject, min, max)| {
        let lo = min * target_size / 100;
        let hi = (max * target_size).div_ceil(100);
        BucketConstraint::subject(*subject, lo, hi.max(lo))
      })
      .collect();
    Self {
      target_size,
      subject_constraints,
      difficulty_ratio: DifficultyRatio::default(),
      trap_ratio_range: TrapRatioRange::default(),
      best_effort: false,
    }
  }

  pub fn constraint_for(&self, subject: Subject) -> Option<&BucketConstraint> {
    self.subject_constraints.iter().find(|c| c.dimension == BucketKey::Subject(subject))
  }
}

impl Default for CompositionConfig {
  fn default() -> Self {
    Self::prelims(100)
  }
}

/// Exact counts per bucket. Subject and difficulty buckets are two
/// independent partitions of the same total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionPlan {
  pub target_size: usize,
  pub subject_counts: BTreeMap<Subject, usize>,
  pub difficulty_counts: BTreeMap<DifficultyLabel, usize>,
  pub trap_target: usize,
}

impl CompositionPlan {
  pub fn count_for(&self, key: BucketKey) -> usize {
    match key {
      BucketKey::Subject(s) => self.subject_counts.get(&s).copied().unwrap_or(0),
      BucketKey::Difficulty(d) => self.difficulty_counts.get(&d).copied().unwrap_or(0),
      BucketKey::TrapItems => self.trap_target,
    }
  }

  pub fn subject_total(&self) -> usize {
    self.subject_counts.values().sum()
  }

  pub fn difficulty_total(&self) -> usize {
    self.difficulty_counts.values().sum()
  }
}

/// Spacing rules the sequencer may set aside when it cannot converge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingRule {
  FormatAdjacency,
  SubjectRun,
  StatementRun,
}

impl SpacingRule {
  pub fn as_str(&self) -> &'static str {
    match self {
      SpacingRule::FormatAdjacency => "format_adjacency",
      SpacingRule::SubjectRun => "subject_run",
      SpacingRule::StatementRun => "statement_run",
    }
  }
}

/// A rule the sequencer relaxed to place the item at `position`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relaxation {
  pub rule: SpacingRule,
  pub position: usize,
}

/// Final product of one composition call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComposedTest {
  pub items: Vec<CandidateItem>,
  pub plan: CompositionPlan,
  pub config: CompositionConfig,
  pub rules: crate::sequencer::SequencingRules,
  pub passing_score: f64,
  #[serde(default)] pub relaxations: Vec<Relaxation>,
  pub seed: u64,
  pub report: ValidationReport,
}

impl ComposedTest {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn item_ids(&self) -> Vec<&str> {
    self.items.iter().map(|i| i.id.as_str()).collect()
  }
}

/// One recorded answer from the attempt log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
  pub item_id: String,
  pub subject: Subject,
  pub topic: String,
  pub correct: bool,
  pub time_spent_secs: f64,
}
