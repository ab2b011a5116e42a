//! Difficulty scoring from eight weighted qualitative factors.
//!
//! Each factor is scored 0–100 against fixed thresholds, then combined with
//! `ScoringWeights` and rounded. The scorer is a pure function of its input:
//! the same item always yields the same score, which keeps composition
//! reproducible.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{DifficultyLabel, ItemContent, ItemFormat, Subject};
use crate::error::ComposeError;
use crate::util::{contains_phrase, step_score, words};

/// Bloom levels with the verbs that signal them, lowest first.
const BLOOM_TAXONOMY: &[(&str, f64, &[&str])] = &[
  ("remember", 15.0, &["identify", "define", "name", "list", "recall", "who", "which one of the following"]),
  ("understand", 30.0, &["explain", "describe", "correct", "correctly", "meaning", "interpret", "summarize", "classify"]),
  ("apply", 50.0, &["apply", "calculate", "compute", "use", "implement", "solve", "demonstrate"]),
  ("analyze", 70.0, &["analyze", "analyse", "compare", "distinguish", "examine", "relationship", "differentiate", "contrast"]),
  ("evaluate", 85.0, &["evaluate", "assess", "justify", "critically", "appraise", "judge"]),
  ("create", 100.0, &["design", "propose", "formulate", "construct", "devise"]),
];

/// Level used when no taxonomy verb appears in the stem.
const DEFAULT_COGNITIVE_SCORE: f64 = 30.0;

/// Canonical Prelims phrasings.
const EXAM_PATTERNS: &[&str] = &[
  "consider the following",
  "statements given above",
  "select the correct answer using the code",
  "how many of the above",
  "how many of the statements",
  "match list",
  "assertion",
  "which one of the following",
  "arrange the following",
  "in the context of",
];

/// Citation patterns shared with the gate's range rules. Group 1 is the
/// cited number where there is one.
pub const ARTICLE_CITATION: &str = r"(?i)\barticles?\s+(\d+)";
pub const SCHEDULE_CITATION: &str = r"(?i)\bschedule\s+(\d+)";
pub const AMENDMENT_CITATION: &str = r"(?i)\b(\d+)(?:st|nd|rd|th)\s+(?:constitutional\s+)?amendment\b";
pub const SECTION_CITATION: &str = r"(?i)\b(?:section|amendment)\s+(\d+)";
pub const ACT_CITATION: &str = r"(?i)\bact(?:\s+of|,)?\s+(1[0-9]{3}|20[0-9]{2})\b";
pub const YEAR_CITATION: &str = r"\b(1[0-9]{3}|20[0-9]{2})\b";

/// Earlier alternatives win where citations overlap ("Act of 1935" is one).
const CITATION_PATTERNS: &[&str] =
  &[ACT_CITATION, ARTICLE_CITATION, SCHEDULE_CITATION, AMENDMENT_CITATION, SECTION_CITATION, YEAR_CITATION];

const COMPLEX_WORD_LEN: usize = 9;

/// Base structural complexity per format.
pub fn format_complexity(format: ItemFormat) -> f64 {
  match format {
    ItemFormat::SingleCorrect => 20.0,
    ItemFormat::OddOneOut => 35.0,
    ItemFormat::MultipleCorrect => 45.0,
    ItemFormat::MapBased => 50.0,
    ItemFormat::StatementBased => 55.0,
    ItemFormat::Sequence => 55.0,
    ItemFormat::MatchPairs => 60.0,
    ItemFormat::AssertionReason => 70.0,
    ItemFormat::DataBased => 75.0,
    ItemFormat::CaseStudy => 80.0,
  }
}

/// Concept-count factor, shared with the quality gate's structural estimate.
pub fn concept_count_score(count: usize) -> f64 {
  step_score(count as f64, &[(0.0, 0.0), (1.0, 20.0), (2.0, 40.0), (3.0, 60.0), (4.0, 80.0)], 100.0)
}

/// Solve-time factor in seconds.
pub fn solve_time_score(secs: f64) -> f64 {
  step_score(secs, &[(45.0, 20.0), (75.0, 40.0), (105.0, 60.0), (150.0, 80.0)], 100.0)
}

/// Rough solve time when the bank does not carry one.
pub fn estimate_solve_secs(format: ItemFormat, content: Option<&ItemContent>) -> f64 {
  match content {
    Some(c) => {
      let words = crate::util::word_count(&c.full_text()) as f64;
      20.0 + words * 0.5 + c.statements.len() as f64 * 12.0 + c.options.len() as f64 * 3.0
    }
    None => 30.0 + format_complexity(format) * 0.8,
  }
}

/// Weight vector for the eight factors. Must sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
  pub concept_count: f64,
  pub cognitive_level: f64,
  pub format_complexity: f64,
  pub solve_time: f64,
  pub subject_integration: f64,
  pub vocabulary: f64,
  pub pattern_alignment: f64,
  pub cross_reference: f64,
}

impl Default for ScoringWeights {
  fn default() -> Self {
    Self {
      concept_count: 0.15,
      cognitive_level: 0.20,
      format_complexity: 0.15,
      solve_time: 0.10,
      subject_integration: 0.10,
      vocabulary: 0.10,
      pattern_alignment: 0.10,
      cross_reference: 0.10,
    }
  }
}

impl ScoringWeights {
  fn as_array(&self) -> [f64; 8] {
    [
      self.concept_count,
      self.cognitive_level,
      self.format_complexity,
      self.solve_time,
      self.subject_integration,
      self.vocabulary,
      self.pattern_alignment,
      self.cross_reference,
    ]
  }

  pub fn validate(&self) -> Result<(), ComposeError> {
    let w = self.as_array();
    if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
      return Err(ComposeError::InvalidConfig("scoring weights must be finite and non-negative".into()));
    }
    let sum: f64 = w.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
      return Err(ComposeError::InvalidConfig(format!("scoring weights must sum to 1, got {sum:.4}")));
    }
    Ok(())
  }
}

/// Per-factor scores, kept for auditing a computed difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyFactors {
  pub concept_count: f64,
  pub cognitive_level: f64,
  pub format_complexity: f64,
  pub solve_time: f64,
  pub subject_integration: f64,
  pub vocabulary: f64,
  pub pattern_alignment: f64,
  pub cross_reference: f64,
}

impl DifficultyFactors {
  fn as_array(&self) -> [f64; 8] {
    [
      self.concept_count,
      self.cognitive_level,
      self.format_complexity,
      self.solve_time,
      self.subject_integration,
      self.vocabulary,
      self.pattern_alignment,
      self.cross_reference,
    ]
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAssessment {
  pub score: f64,
  pub label: DifficultyLabel,
  pub factors: DifficultyFactors,
}

/// Borrowed view of the features the scorer reads.
#[derive(Clone, Copy, Debug)]
pub struct ScoringInput<'a> {
  pub subject: Subject,
  pub format: ItemFormat,
  pub concept_tags: &'a BTreeSet<String>,
  pub content: Option<&'a ItemContent>,
}

#[derive(Clone, Debug)]
pub struct DifficultyScorer {
  weights: ScoringWeights,
  citations: Regex,
}

/// One alternation over `CITATION_PATTERNS`, matched left to right.
pub fn citation_regex() -> Result<Regex, ComposeError> {
  let alternation: Vec<String> = CITATION_PATTERNS.iter().map(|p| format!("(?:{p})")).collect();
  Regex::new(&alternation.join("|")).map_err(|e| ComposeError::InvalidConfig(format!("invalid citation pattern: {e}")))
}

impl DifficultyScorer {
  pub fn new(weights: ScoringWeights) -> Result<Self, ComposeError> {
    weights.validate()?;
    Ok(Self { weights, citations: citation_regex()? })
  }

  pub fn weights(&self) -> &ScoringWeights {
    &self.weights
  }

  pub fn factors(&self, input: &ScoringInput<'_>) -> DifficultyFactors {
    let stem_lower = input.content.map(|c| c.stem.to_lowercase()).unwrap_or_default();
    let full_text = input.content.map(|c| c.full_text()).unwrap_or_default();
    let full_lower = full_text.to_lowercase();

    let solve_secs = input
      .content
      .and_then(|c| c.expected_solve_secs)
      .map(f64::from)
      .unwrap_or_else(|| estimate_solve_secs(input.format, input.content));

    DifficultyFactors {
      concept_count: concept_count_score(input.concept_tags.len()),
      cognitive_level: cognitive_level_score(&stem_lower),
      format_complexity: format_complexity(input.format),
      solve_time: solve_time_score(solve_secs),
      subject_integration: subject_integration_score(input.subject, input.concept_tags),
      vocabulary: vocabulary_score(&full_text),
      pattern_alignment: pattern_alignment_score(&full_lower),
      cross_reference: cross_reference_score(self.count_citations(&full_text)),
    }
  }

  pub fn assess(&self, input: &ScoringInput<'_>) -> DifficultyAssessment {
    let factors = self.factors(input);
    let weighted: f64 = factors
      .as_array()
      .iter()
      .zip(self.weights.as_array().iter())
      .map(|(f, w)| f * w)
      .sum();
    let score = weighted.round().clamp(0.0, 100.0);
    DifficultyAssessment { score, label: DifficultyLabel::from_score(score), factors }
  }

  /// Legal and historical citations: "Article 21", "42nd Amendment",
  /// "Act of 1935", "Act, 1956", and bare years.
  pub fn count_citations(&self, text: &str) -> usize {
    self.citations.find_iter(text).count()
  }
}

/// Highest Bloom level whose verbs appear in the stem.
pub fn cognitive_level_score(stem_lower: &str) -> f64 {
  BLOOM_TAXONOMY
    .iter()
    .rev()
    .find(|(_, _, verbs)| verbs.iter().any(|v| contains_phrase(stem_lower, v)))
    .map(|(_, score, _)| *score)
    .unwrap_or(DEFAULT_COGNITIVE_SCORE)
}

/// Distinct subjects touched: the item's own plus any `subject:` tag prefix.
pub fn subject_integration_score(subject: Subject, tags: &BTreeSet<String>) -> f64 {
  let mut touched: HashSet<Subject> = HashSet::from([subject]);
  for tag in tags {
    if let Some((prefix, _)) = tag.split_once(':') {
      if let Some(s) = Subject::from_tag_prefix(prefix) {
        touched.insert(s);
      }
    }
  }
  step_score(touched.len() as f64, &[(1.0, 20.0), (2.0, 55.0), (3.0, 80.0)], 100.0)
}

pub fn vocabulary_score(text: &str) -> f64 {
  let tokens = words(text);
  if tokens.is_empty() {
    return 20.0;
  }
  let complex = tokens.iter().filter(|w| w.chars().count() >= COMPLEX_WORD_LEN).count();
  let ratio = complex as f64 / tokens.len() as f64;
  step_score(ratio, &[(0.10, 20.0), (0.20, 45.0), (0.30, 70.0)], 90.0)
}

pub fn pattern_alignment_score(text_lower: &str) -> f64 {
  let hits = EXAM_PATTERNS.iter().filter(|p| contains_phrase(text_lower, p)).count();
  step_score(hits as f64, &[(0.0, 20.0), (1.0, 50.0), (2.0, 75.0)], 100.0)
}

pub fn cross_reference_score(citations: usize) -> f64 {
  step_score(citations as f64, &[(0.0, 0.0), (1.0, 40.0), (2.0, 70.0)], 100.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tags(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  fn simple_recall() -> (BTreeSet<String>, ItemContent) {
    let content = ItemContent {
      stem: "Which one of the following is the guardian of the Constitution?".into(),
      statements: vec![],
      options: vec!["Parliament".into(), "Supreme Court".into(), "President".into(), "Election Commission".into()],
      correct_options: vec![1],
      explanation: "The Supreme Court interprets and protects the Constitution.".into(),
      expected_solve_secs: Some(40),
    };
    (tags(&["judiciary"]), content)
  }

  #[test]
  fn default_weights_are_valid() {
    assert!(ScoringWeights::default().validate().is_ok());
    let bad = ScoringWeights { cognitive_level: 0.5, ..ScoringWeights::default() };
    assert!(matches!(bad.validate(), Err(ComposeError::InvalidConfig(_))));
  }

  #[test]
  fn simple_recall_item_is_easy() {
    let (t, content) = simple_recall();
    let scorer = DifficultyScorer::new(ScoringWeights::default()).expect("scorer");
    let input = ScoringInput { subject: Subject::Polity, format: ItemFormat::SingleCorrect, concept_tags: &t, content: Some(&content) };
    let out = scorer.assess(&input);
    assert_eq!(out.factors.concept_count, 20.0);
    assert_eq!(out.factors.cognitive_level, 15.0);
    assert_eq!(out.factors.solve_time, 20.0);
    assert_eq!(out.factors.pattern_alignment, 50.0);
    assert_eq!(out.factors.cross_reference, 0.0);
    assert_eq!(out.label, DifficultyLabel::Easy);
    assert!(out.score <= 35.0, "score={}", out.score);
  }

  #[test]
  fn integrated_assertion_reason_item_is_hard() {
    let t = tags(&["amendment-procedure", "history:government-of-india-act", "economy:fiscal-federalism", "basic-structure"]);
    let content = ItemContent {
      stem: "Assertion (A): Parliament cannot amend the basic structure under Article 368. Reason (R): Article 13 bars laws abridging fundamental rights, a principle traced to the Government of India Act of 1935. Critically evaluate both statements.".into(),
      statements: vec!["Assertion (A) as given".into(), "Reason (R) as given".into()],
      options: vec![
        "Both A and R are true and R is the correct explanation of A".into(),
        "Both A and R are true but R is not the correct explanation of A".into(),
        "A is true but R is false".into(),
        "A is false but R is true".into(),
      ],
      correct_options: vec![1],
      explanation: "Kesavananda Bharati established the doctrine.".into(),
      expected_solve_secs: Some(160),
    };
    let scorer = DifficultyScorer::new(ScoringWeights::default()).expect("scorer");
    let input = ScoringInput { subject: Subject::Polity, format: ItemFormat::AssertionReason, concept_tags: &t, content: Some(&content) };
    let out = scorer.assess(&input);
    assert_eq!(out.factors.cognitive_level, 85.0);
    assert_eq!(out.factors.subject_integration, 80.0);
    assert_eq!(out.factors.cross_reference, 100.0);
    assert_eq!(out.label, DifficultyLabel::Hard);
  }

  #[test]
  fn scoring_is_pure() {
    let (t, content) = simple_recall();
    let scorer = DifficultyScorer::new(ScoringWeights::default()).expect("scorer");
    let input = ScoringInput { subject: Subject::Polity, format: ItemFormat::SingleCorrect, concept_tags: &t, content: Some(&content) };
    let a = scorer.assess(&input);
    let b = scorer.assess(&input);
    assert_eq!(a, b);
  }

  #[test]
  fn missing_content_uses_format_defaults() {
    let t = tags(&["monsoon"]);
    let scorer = DifficultyScorer::new(ScoringWeights::default()).expect("scorer");
    let input = ScoringInput { subject: Subject::Geography, format: ItemFormat::MapBased, concept_tags: &t, content: None };
    let f = scorer.factors(&input);
    assert_eq!(f.cognitive_level, DEFAULT_COGNITIVE_SCORE);
    assert_eq!(f.vocabulary, 20.0);
    assert_eq!(f.pattern_alignment, 20.0);
    assert_eq!(f.cross_reference, 0.0);
  }

  #[test]
  fn citation_counting_handles_acts_and_years() {
    let scorer = DifficultyScorer::new(ScoringWeights::default()).expect("scorer");
    assert_eq!(scorer.count_citations("Article 21 and Schedule 7"), 2);
    assert_eq!(scorer.count_citations("the Act of 1935 and the Companies Act, 1956"), 2);
    assert_eq!(scorer.count_citations("the revolt of 1857"), 1);
    assert_eq!(scorer.count_citations("no citations here"), 0);
  }

  #[test]
  fn ordinal_amendments_count_as_citations() {
    let scorer = DifficultyScorer::new(ScoringWeights::default()).expect("scorer");
    assert_eq!(scorer.count_citations("The 42nd Amendment added the word socialist."), 1);
    assert_eq!(scorer.count_citations("the 44th constitutional amendment of 1978"), 2);
    assert_eq!(cross_reference_score(scorer.count_citations("The 42nd Amendment")), 40.0);
  }

  #[test]
  fn label_thresholds_are_fixed() {
    assert_eq!(DifficultyLabel::from_score(35.0), DifficultyLabel::Easy);
    assert_eq!(DifficultyLabel::from_score(35.5), DifficultyLabel::Medium);
    assert_eq!(DifficultyLabel::from_score(70.0), DifficultyLabel::Medium);
    assert_eq!(DifficultyLabel::from_score(71.0), DifficultyLabel::Hard);
  }
}
