//! Quality gate: structural completeness, factual-consistency heuristics,
//! ambiguity detection and difficulty/label agreement.
//!
//! Flow:
//! 1) Every check subtracts penalties from a starting score of 100.
//! 2) Pattern heuristics come from a versioned rule table (pattern → penalty)
//!    compiled once when the gate is built; extra rules may come from config.
//! 3) `quality_score = max(0, 100 − Σ penalties)`, `passed = score ≥ threshold`.
//!    An item without concept tags never passes, whatever its score.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::difficulty::{
  concept_count_score, estimate_solve_secs, format_complexity, solve_time_score, AMENDMENT_CITATION, ARTICLE_CITATION,
  SCHEDULE_CITATION, YEAR_CITATION,
};
use crate::domain::{CandidateItem, DifficultyLabel, ItemContent, ItemFormat, Subject};
use crate::error::ComposeError;
use crate::util::words;

pub const RULESET_VERSION: &str = "quality_rules.v1";

const HEDGE_WORDS: &[&str] = &[
  "may", "might", "perhaps", "possibly", "probably", "sometimes", "generally", "often", "usually", "arguably",
  "likely", "somewhat", "fairly",
];

const UNCLEAR_PRONOUNS: &[&str] = &["it", "its", "this", "that", "they", "them", "these", "those"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
  Structure,
  Factual,
  Ambiguity,
  Difficulty,
}

/// Which part of the item a pattern rule reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
  /// Stem only.
  Stem,
  /// Stem, statements and options.
  Body,
  /// Explanation plus the text of the keyed options: what the item claims is true.
  Claims,
}

/// Pattern rule as it appears in config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
  pub id: String,
  pub check: GateCheck,
  pub scope: RuleScope,
  pub pattern: String,
  pub penalty: f64,
}

#[derive(Clone, Copy)]
struct PatternDef {
  id: &'static str,
  check: GateCheck,
  scope: RuleScope,
  pattern: &'static str,
  penalty: f64,
}

/// Numbers captured by `pattern` must fall in `[min, max]`.
#[derive(Clone, Copy)]
struct RangeDef {
  id: &'static str,
  pattern: &'static str,
  min: u32,
  max: u32,
  penalty: f64,
}

macro_rules! rule {
  ($id:expr, $check:expr, $scope:expr, $pattern:expr, $penalty:expr) => {
    PatternDef { id: $id, check: $check, scope: $scope, pattern: $pattern, penalty: $penalty }
  };
}

macro_rules! range {
  ($id:expr, $pattern:expr, $min:expr, $max:expr, $penalty:expr) => {
    RangeDef { id: $id, pattern: $pattern, min: $min, max: $max, penalty: $penalty }
  };
}

const RANGE_RULES: &[RangeDef] = &[
  range!("fact.article_range", ARTICLE_CITATION, 1, 395, 20.0),
  range!("fact.schedule_range", SCHEDULE_CITATION, 1, 12, 15.0),
  range!("fact.amendment_range", AMENDMENT_CITATION, 1, 106, 10.0),
];

const PATTERN_RULES: &[PatternDef] = &[
  rule!("fact.president_head_of_government", GateCheck::Factual, RuleScope::Claims, r"(?i)\bpresident\b[^.]*\bhead of (?:the )?government\b", 20.0),
  rule!("fact.rajya_sabha_dissolved", GateCheck::Factual, RuleScope::Claims, r"(?i)\brajya sabha\b[^.]*\b(?:is|can be|gets) dissolved\b", 20.0),
  rule!("fact.pm_directly_elected", GateCheck::Factual, RuleScope::Claims, r"(?i)\bprime minister\b[^.]*\bdirectly elected\b", 20.0),
  rule!("fact.money_bill_upper_house", GateCheck::Factual, RuleScope::Claims, r"(?i)\bmoney bills?\b[^.]*\b(?:introduced|originates?) in (?:the )?rajya sabha\b", 20.0),
  rule!("fact.governor_popularly_elected", GateCheck::Factual, RuleScope::Claims, r"(?i)\bgovernor\b[^.]*\belected by the people\b", 15.0),
  rule!("fact.rbi_fiscal_policy", GateCheck::Factual, RuleScope::Claims, r"(?i)\b(?:reserve bank|rbi)\b[^.]*\bframes? (?:the )?fiscal policy\b", 15.0),
  rule!("ambiguity.double_negative", GateCheck::Ambiguity, RuleScope::Stem, r"(?i)\bnot\b[^.?]*\b(?:not|never|no)\b", 10.0),
  rule!("ambiguity.not_except", GateCheck::Ambiguity, RuleScope::Stem, r"(?i)\bnot\b[^.?]*\bexcept\b", 10.0),
  rule!("ambiguity.and_or", GateCheck::Ambiguity, RuleScope::Body, r"(?i)\band/or\b", 5.0),
];

/// Tunable gate thresholds and fixed-check penalties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
  pub passing_score: f64,
  /// Width, in score points, added to each side of a label's band.
  pub difficulty_tolerance: f64,
  pub stem_min_chars: usize,
  pub stem_max_chars: usize,
  pub hedge_density_max: f64,
  pub pronoun_density_max: f64,
  /// Extra rules appended to the built-in table.
  pub extra_rules: Vec<PatternRule>,
}

impl Default for GateThresholds {
  fn default() -> Self {
    Self {
      passing_score: 70.0,
      difficulty_tolerance: 20.0,
      stem_min_chars: 20,
      stem_max_chars: 1200,
      hedge_density_max: 0.05,
      pronoun_density_max: 0.08,
      extra_rules: Vec::new(),
    }
  }
}

/// Facts supplied alongside an item by the content pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFacts {
  #[serde(default)] pub facts: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
  pub rule_id: String,
  pub check: GateCheck,
  pub penalty: f64,
  pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
  pub quality_score: f64,
  pub passed: bool,
  pub structural_estimate: f64,
  pub findings: Vec<Finding>,
  pub ruleset: String,
}

impl GateVerdict {
  pub fn penalty_for(&self, check: GateCheck) -> f64 {
    self.findings.iter().filter(|f| f.check == check).map(|f| f.penalty).sum()
  }
}

/// Borrowed view of what the gate inspects.
#[derive(Clone, Copy, Debug)]
pub struct GateInput<'a> {
  pub subject: Subject,
  pub topic: &'a str,
  pub format: ItemFormat,
  pub concept_tags: &'a BTreeSet<String>,
  pub declared_label: DifficultyLabel,
  pub content: Option<&'a ItemContent>,
}

impl<'a> From<&'a CandidateItem> for GateInput<'a> {
  fn from(item: &'a CandidateItem) -> Self {
    Self {
      subject: item.subject,
      topic: &item.topic,
      format: item.format,
      concept_tags: &item.concept_tags,
      declared_label: item.difficulty_label,
      content: item.content.as_ref(),
    }
  }
}

struct CompiledRule {
  id: String,
  check: GateCheck,
  scope: RuleScope,
  regex: Regex,
  penalty: f64,
}

struct CompiledRange {
  id: &'static str,
  regex: Regex,
  min: u32,
  max: u32,
  penalty: f64,
}

pub struct QualityGate {
  thresholds: GateThresholds,
  rules: Vec<CompiledRule>,
  ranges: Vec<CompiledRange>,
  year: Regex,
}

impl std::fmt::Debug for QualityGate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QualityGate")
      .field("thresholds", &self.thresholds)
      .field("rules", &self.rules.len())
      .field("ranges", &self.ranges.len())
      .finish()
  }
}

fn compile(id: &str, pattern: &str) -> Result<Regex, ComposeError> {
  Regex::new(pattern).map_err(|e| ComposeError::InvalidConfig(format!("invalid gate rule '{id}': {e}")))
}

impl QualityGate {
  pub fn new(thresholds: GateThresholds) -> Result<Self, ComposeError> {
    if !(0.0..=100.0).contains(&thresholds.passing_score) {
      return Err(ComposeError::InvalidConfig("passing_score must be within 0..=100".into()));
    }
    let mut rules = Vec::with_capacity(PATTERN_RULES.len() + thresholds.extra_rules.len());
    for def in PATTERN_RULES {
      rules.push(CompiledRule {
        id: def.id.to_string(),
        check: def.check,
        scope: def.scope,
        regex: compile(def.id, def.pattern)?,
        penalty: def.penalty,
      });
    }
    for extra in &thresholds.extra_rules {
      if extra.penalty < 0.0 {
        return Err(ComposeError::InvalidConfig(format!("gate rule '{}' has a negative penalty", extra.id)));
      }
      rules.push(CompiledRule {
        id: extra.id.clone(),
        check: extra.check,
        scope: extra.scope,
        regex: compile(&extra.id, &extra.pattern)?,
        penalty: extra.penalty,
      });
    }
    let mut ranges = Vec::with_capacity(RANGE_RULES.len());
    for def in RANGE_RULES {
      ranges.push(CompiledRange { id: def.id, regex: compile(def.id, def.pattern)?, min: def.min, max: def.max, penalty: def.penalty });
    }
    let year = compile("fact.year", YEAR_CITATION)?;
    Ok(Self { thresholds, rules, ranges, year })
  }

  pub fn thresholds(&self) -> &GateThresholds {
    &self.thresholds
  }

  pub fn rule_count(&self) -> usize {
    self.rules.len() + self.ranges.len()
  }

  #[instrument(level = "debug", skip(self, input, facts), fields(format = %input.format, subject = %input.subject))]
  pub fn evaluate(&self, input: &GateInput<'_>, facts: Option<&SourceFacts>) -> GateVerdict {
    let mut findings: Vec<Finding> = vec![];
    self.check_structure(input, &mut findings);
    if let Some(content) = input.content {
      self.check_factual(content, facts, &mut findings);
      self.check_ambiguity(content, &mut findings);
    }
    let structural_estimate = structural_estimate(input.format, input.concept_tags.len(), input.content);
    self.check_difficulty(input.declared_label, structural_estimate, &mut findings);

    let penalties: f64 = findings.iter().map(|f| f.penalty).sum();
    let quality_score = (100.0 - penalties).max(0.0);
    let passed = quality_score >= self.thresholds.passing_score && !input.concept_tags.is_empty();
    if !passed {
      debug!(target: "gate", quality_score, findings = findings.len(), "Item failed quality gate");
    }
    GateVerdict { quality_score, passed, structural_estimate, findings, ruleset: RULESET_VERSION.to_string() }
  }

  fn check_structure(&self, input: &GateInput<'_>, out: &mut Vec<Finding>) {
    let mut push = |id: &str, penalty: f64, detail: String| {
      out.push(Finding { rule_id: id.to_string(), check: GateCheck::Structure, penalty, detail });
    };

    if input.topic.trim().is_empty() {
      push("struct.topic_missing", 10.0, "topic is empty".into());
    }
    if input.concept_tags.is_empty() {
      push("struct.concepts_missing", 15.0, "no concept tags".into());
    }

    let Some(c) = input.content else {
      push("struct.content_missing", 40.0, "item carries no question text".into());
      return;
    };

    let stem_chars = c.stem.trim().chars().count();
    if stem_chars == 0 {
      push("struct.stem_empty", 40.0, "question stem is empty".into());
    } else if stem_chars < self.thresholds.stem_min_chars {
      push("struct.stem_short", 10.0, format!("stem has {stem_chars} chars, min {}", self.thresholds.stem_min_chars));
    } else if stem_chars > self.thresholds.stem_max_chars {
      push("struct.stem_long", 10.0, format!("stem has {stem_chars} chars, max {}", self.thresholds.stem_max_chars));
    }

    if c.options.len() < 2 {
      push("struct.options_missing", 25.0, format!("{} option(s)", c.options.len()));
    } else if c.options.len() != 4 {
      push("struct.option_count", 5.0, format!("{} options, expected 4", c.options.len()));
    }
    if c.options.iter().any(|o| o.trim().is_empty()) {
      push("struct.option_blank", 10.0, "an option is blank".into());
    }

    if c.correct_options.is_empty() {
      push("struct.answer_missing", 25.0, "no keyed answer".into());
    } else if c.correct_options.iter().any(|i| *i >= c.options.len()) {
      push("struct.answer_out_of_range", 25.0, format!("keyed answer outside {} options", c.options.len()));
    } else if c.correct_options.len() > 1 && input.format != ItemFormat::MultipleCorrect {
      push("struct.answer_multiple", 10.0, format!("{} keyed answers for a single-answer format", c.correct_options.len()));
    }

    if input.format.requires_statements() && c.statements.len() < 2 {
      push("struct.statements_missing", 15.0, format!("{} needs at least 2 statements", input.format));
    }
    if c.explanation.trim().is_empty() {
      push("struct.explanation_missing", 10.0, "explanation is empty".into());
    }
  }

  fn check_factual(&self, c: &ItemContent, facts: Option<&SourceFacts>, out: &mut Vec<Finding>) {
    let body = c.full_text();
    let claims = claims_text(c);

    for range in &self.ranges {
      let bad: Vec<u32> = range
        .regex
        .captures_iter(&body)
        .filter_map(|cap| cap.get(1).and_then(|m| m.as_str().parse::<u32>().ok()))
        .filter(|n| *n < range.min || *n > range.max)
        .collect();
      if !bad.is_empty() {
        out.push(Finding {
          rule_id: range.id.to_string(),
          check: GateCheck::Factual,
          penalty: range.penalty,
          detail: format!("{bad:?} outside {}..={}", range.min, range.max),
        });
      }
    }

    if let Some(facts) = facts.filter(|f| !f.facts.is_empty()) {
      let unsupported: BTreeSet<&str> = self
        .year
        .find_iter(&claims)
        .map(|m| m.as_str())
        .filter(|y| !facts.facts.iter().any(|f| f.contains(y)))
        .collect();
      if !unsupported.is_empty() {
        out.push(Finding {
          rule_id: "fact.unsupported_year".into(),
          check: GateCheck::Factual,
          penalty: 10.0,
          detail: format!("years not in source facts: {unsupported:?}"),
        });
      }
    }

    self.apply_rules(GateCheck::Factual, c, &body, &claims, out);
  }

  fn check_ambiguity(&self, c: &ItemContent, out: &mut Vec<Finding>) {
    let mut text = c.stem.clone();
    for s in &c.statements {
      text.push(' ');
      text.push_str(s);
    }
    let tokens = words(&text);
    if !tokens.is_empty() {
      let total = tokens.len() as f64;
      let hedges = tokens.iter().filter(|w| HEDGE_WORDS.contains(&w.as_str())).count() as f64;
      if hedges / total > self.thresholds.hedge_density_max {
        out.push(Finding {
          rule_id: "ambiguity.hedge_density".into(),
          check: GateCheck::Ambiguity,
          penalty: 15.0,
          detail: format!("{hedges} hedge words in {total} words"),
        });
      }
      let pronouns = tokens.iter().filter(|w| UNCLEAR_PRONOUNS.contains(&w.as_str())).count() as f64;
      if pronouns / total > self.thresholds.pronoun_density_max {
        out.push(Finding {
          rule_id: "ambiguity.pronoun_density".into(),
          check: GateCheck::Ambiguity,
          penalty: 10.0,
          detail: format!("{pronouns} unclear pronouns in {total} words"),
        });
      }
    }
    let body = c.full_text();
    let claims = claims_text(c);
    self.apply_rules(GateCheck::Ambiguity, c, &body, &claims, out);
  }

  fn apply_rules(&self, check: GateCheck, c: &ItemContent, body: &str, claims: &str, out: &mut Vec<Finding>) {
    for rule in self.rules.iter().filter(|r| r.check == check) {
      let haystack = match rule.scope {
        RuleScope::Stem => c.stem.as_str(),
        RuleScope::Body => body,
        RuleScope::Claims => claims,
      };
      if let Some(m) = rule.regex.find(haystack) {
        out.push(Finding {
          rule_id: rule.id.clone(),
          check,
          penalty: rule.penalty,
          detail: format!("matched '{}'", crate::util::trunc_for_log(m.as_str(), 60)),
        });
      }
    }
  }

  fn check_difficulty(&self, label: DifficultyLabel, estimate: f64, out: &mut Vec<Finding>) {
    let (lo, hi) = label.band();
    let tol = self.thresholds.difficulty_tolerance;
    if estimate < lo - tol || estimate > hi + tol {
      out.push(Finding {
        rule_id: "difficulty.label_mismatch".into(),
        check: GateCheck::Difficulty,
        penalty: 15.0,
        detail: format!("structural estimate {estimate:.1} outside {label} band {:.0}..={:.0}", lo - tol, hi + tol),
      });
    }
  }
}

/// Independent difficulty estimate from structure alone: format, concept
/// breadth and solve length. Text heuristics are left out on purpose so it
/// can cross-check the scorer.
pub fn structural_estimate(format: ItemFormat, concept_count: usize, content: Option<&ItemContent>) -> f64 {
  let secs = content
    .and_then(|c| c.expected_solve_secs)
    .map(f64::from)
    .unwrap_or_else(|| estimate_solve_secs(format, content));
  0.4 * format_complexity(format) + 0.3 * concept_count_score(concept_count) + 0.3 * solve_time_score(secs)
}

fn claims_text(c: &ItemContent) -> String {
  let mut parts = vec![c.explanation.clone()];
  for i in &c.correct_options {
    if let Some(o) = c.options.get(*i) {
      parts.push(o.clone());
    }
  }
  parts.join("\n")
}

/// True when an option is a catch-all designed to punish careless reading.
pub fn has_trap_marker(content: &ItemContent) -> bool {
  const MARKERS: &[&str] = &["none of the above", "all of the above", "none of these", "all of these"];
  content.options.iter().any(|o| {
    let lower = o.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tags(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  fn clean_content() -> ItemContent {
    ItemContent {
      stem: "Consider the following statements about the Finance Commission of India:".into(),
      statements: vec![
        "1. Article 280 provides for the Finance Commission.".into(),
        "2. The President constitutes the commission every five years.".into(),
      ],
      options: vec!["1 only".into(), "2 only".into(), "Both 1 and 2".into(), "Neither 1 nor 2".into()],
      correct_options: vec![2],
      explanation: "Both statements follow from Article 280 of the Constitution.".into(),
      expected_solve_secs: Some(90),
    }
  }

  fn input<'a>(tags: &'a BTreeSet<String>, content: Option<&'a ItemContent>, label: DifficultyLabel) -> GateInput<'a> {
    GateInput {
      subject: Subject::Polity,
      topic: "fiscal federalism",
      format: ItemFormat::StatementBased,
      concept_tags: tags,
      declared_label: label,
      content,
    }
  }

  #[test]
  fn clean_item_scores_full_marks() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["finance-commission", "article-280"]);
    let c = clean_content();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert!(v.findings.is_empty(), "{:?}", v.findings);
    assert_eq!(v.quality_score, 100.0);
    assert!(v.passed);
  }

  #[test]
  fn missing_content_fails_the_gate() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["x"]);
    let v = gate.evaluate(&input(&t, None, DifficultyLabel::Medium), None);
    assert_eq!(v.quality_score, 60.0);
    assert!(!v.passed);
  }

  #[test]
  fn out_of_range_article_is_penalized_once_per_rule() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["fundamental-rights"]);
    let mut c = clean_content();
    c.statements = vec!["1. Article 512 guarantees equality.".into(), "2. Article 999 abolishes titles.".into()];
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert_eq!(v.penalty_for(GateCheck::Factual), 20.0);
    assert!(v.findings.iter().any(|f| f.rule_id == "fact.article_range"));
  }

  #[test]
  fn contradictions_only_count_in_claimed_answers() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["executive"]);
    let mut c = clean_content();
    // A false statement offered for evaluation is fine.
    c.statements[1] = "2. The President is the head of government.".into();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert_eq!(v.penalty_for(GateCheck::Factual), 0.0);

    c.explanation = "The President is the head of government in India.".into();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert!(v.findings.iter().any(|f| f.rule_id == "fact.president_head_of_government"));
  }

  #[test]
  fn hedging_stem_is_ambiguous() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["monsoon"]);
    let mut c = clean_content();
    c.stem = "Monsoon rains may perhaps usually arrive early, and possibly often late:".into();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert!(v.findings.iter().any(|f| f.rule_id == "ambiguity.hedge_density"));
  }

  #[test]
  fn declared_label_far_from_structure_is_penalized() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["a"]);
    let mut c = clean_content();
    c.expected_solve_secs = Some(30);
    // StatementBased, 1 concept, 30s → 0.4*55 + 0.3*20 + 0.3*20 = 34
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Hard), None);
    assert!((v.structural_estimate - 34.0).abs() < 1e-9);
    assert_eq!(v.penalty_for(GateCheck::Difficulty), 15.0);
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Easy), None);
    assert_eq!(v.penalty_for(GateCheck::Difficulty), 0.0);
  }

  #[test]
  fn unsupported_years_need_source_facts() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = tags(&["a", "b"]);
    let mut c = clean_content();
    c.explanation = "The commission was first constituted in 1951.".into();
    let facts = SourceFacts { facts: vec!["The First Finance Commission was set up in 1951.".into()] };
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), Some(&facts));
    assert_eq!(v.penalty_for(GateCheck::Factual), 0.0);
    let facts = SourceFacts { facts: vec!["It was set up after independence.".into()] };
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), Some(&facts));
    assert!(v.findings.iter().any(|f| f.rule_id == "fact.unsupported_year"));
  }

  #[test]
  fn extra_rules_from_config_are_compiled() {
    let thresholds = GateThresholds {
      extra_rules: vec![PatternRule {
        id: "fact.custom".into(),
        check: GateCheck::Factual,
        scope: RuleScope::Body,
        pattern: r"(?i)finance commission".into(),
        penalty: 5.0,
      }],
      ..GateThresholds::default()
    };
    let gate = QualityGate::new(thresholds).expect("gate");
    let t = tags(&["a", "b"]);
    let c = clean_content();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert_eq!(v.quality_score, 95.0);

    let broken = GateThresholds {
      extra_rules: vec![PatternRule { id: "bad".into(), check: GateCheck::Factual, scope: RuleScope::Body, pattern: "(".into(), penalty: 1.0 }],
      ..GateThresholds::default()
    };
    assert!(matches!(QualityGate::new(broken), Err(ComposeError::InvalidConfig(_))));
  }

  #[test]
  fn untagged_item_fails_even_with_a_high_score() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let t = BTreeSet::new();
    let c = clean_content();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert_eq!(v.quality_score, 85.0);
    assert!(!v.passed);
    assert!(v.findings.iter().any(|f| f.rule_id == "struct.concepts_missing"));
  }

  #[test]
  fn amendment_citations_use_the_scorer_patterns() {
    let gate = QualityGate::new(GateThresholds::default()).expect("gate");
    let scorer = crate::difficulty::DifficultyScorer::new(Default::default()).expect("scorer");
    let t = tags(&["amendments"]);
    let mut c = clean_content();
    c.statements[1] = "2. The 142nd Amendment renamed the commission.".into();
    let v = gate.evaluate(&input(&t, Some(&c), DifficultyLabel::Medium), None);
    assert!(v.findings.iter().any(|f| f.rule_id == "fact.amendment_range"));
    assert_eq!(scorer.count_citations(&c.statements[1]), 1);
  }

  #[test]
  fn trap_marker_detection() {
    let c = clean_content();
    assert!(!has_trap_marker(&c));
    let mut trap = c.clone();
    trap.options[3] = "None of the above".into();
    assert!(has_trap_marker(&trap));
  }
}
