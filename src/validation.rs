//! Post-hoc audit of a composed test against its plan, config and rules.
//!
//! Everything is re-derived from the ordered items; nothing is trusted from
//! the pipeline that built them. Calling it twice gives the same report.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{CandidateItem, ComposedTest, CompositionConfig, CompositionPlan, DifficultyLabel, Relaxation, Subject};
use crate::quota::trap_bounds;
use crate::sequencer::{spacing_breaks, SequencingRules};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Violation {
  pub rule: String,
  pub expected: String,
  pub actual: String,
}

impl Violation {
  fn new(rule: impl Into<String>, expected: impl ToString, actual: impl ToString) -> Self {
    Self { rule: rule.into(), expected: expected.to_string(), actual: actual.to_string() }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
  pub valid: bool,
  pub violations: Vec<Violation>,
  /// Spacing breaks the sequencer recorded as deliberate relaxations.
  #[serde(default)] pub relaxed: Vec<Relaxation>,
}

/// Everything the audit reads, borrowed from a test or from the pipeline.
#[derive(Clone, Copy, Debug)]
pub struct Audit<'a> {
  pub items: &'a [CandidateItem],
  pub plan: &'a CompositionPlan,
  pub config: &'a CompositionConfig,
  pub rules: &'a SequencingRules,
  pub passing_score: f64,
  pub relaxations: &'a [Relaxation],
}

impl<'a> From<&'a ComposedTest> for Audit<'a> {
  fn from(t: &'a ComposedTest) -> Self {
    Self {
      items: &t.items,
      plan: &t.plan,
      config: &t.config,
      rules: &t.rules,
      passing_score: t.passing_score,
      relaxations: &t.relaxations,
    }
  }
}

pub fn validate(test: &ComposedTest) -> ValidationReport {
  audit(&Audit::from(test))
}

#[instrument(level = "debug", skip_all, fields(items = a.items.len()))]
pub fn audit(a: &Audit<'_>) -> ValidationReport {
  let mut v: Vec<Violation> = vec![];
  let n = a.items.len();

  if n != a.plan.target_size || n != a.config.target_size {
    v.push(Violation::new("total_size", a.config.target_size, n));
  }

  let mut subjects: BTreeMap<Subject, usize> = BTreeMap::new();
  let mut labels: BTreeMap<DifficultyLabel, usize> = BTreeMap::new();
  for item in a.items {
    *subjects.entry(item.subject).or_default() += 1;
    *labels.entry(item.difficulty_label).or_default() += 1;
  }
  for subject in Subject::ALL {
    let got = subjects.get(&subject).copied().unwrap_or(0);
    let want = a.plan.subject_counts.get(&subject).copied().unwrap_or(0);
    if got != want {
      v.push(Violation::new(format!("subject_count:{subject}"), want, got));
    }
    if let Some(c) = a.config.constraint_for(subject) {
      if got < c.min_count || got > c.max_count {
        v.push(Violation::new(format!("subject_range:{subject}"), format!("{}..={}", c.min_count, c.max_count), got));
      }
    }
  }
  for label in DifficultyLabel::ALL {
    let got = labels.get(&label).copied().unwrap_or(0);
    let want = a.plan.difficulty_counts.get(&label).copied().unwrap_or(0);
    if got != want {
      v.push(Violation::new(format!("difficulty_count:{label}"), want, got));
    }
  }

  let mut seen: HashSet<&str> = HashSet::new();
  for item in a.items {
    if !seen.insert(item.id.as_str()) {
      v.push(Violation::new("duplicate_id", "unique ids", &item.id));
    }
    if !item.label_is_consistent() {
      v.push(Violation::new(
        "label_consistency",
        DifficultyLabel::from_score(item.raw_difficulty_score),
        format!("{} labelled {}", item.id, item.difficulty_label),
      ));
    }
    if item.quality_score < a.passing_score {
      v.push(Violation::new("quality_gate", format!(">= {}", a.passing_score), format!("{} scored {}", item.id, item.quality_score)));
    }
  }

  let mut relaxed = vec![];
  for b in spacing_breaks(a.items, a.rules) {
    if a.relaxations.contains(&b) {
      relaxed.push(b);
      continue;
    }
    let expected = match b.rule {
      crate::domain::SpacingRule::FormatAdjacency => "adjacent items differ in format".to_string(),
      crate::domain::SpacingRule::SubjectRun => format!("at most {} consecutive items per subject", a.rules.max_subject_run),
      crate::domain::SpacingRule::StatementRun => format!(
        "statement runs of at most {} followed by {} other items",
        a.rules.max_statement_run, a.rules.min_statement_gap
      ),
    };
    v.push(Violation::new(b.rule.as_str(), expected, format!("position {}", b.position)));
  }

  let trap_positions: Vec<usize> = a.items.iter().enumerate().filter(|(_, i)| i.is_trap).map(|(p, _)| p).collect();
  if n > 0 {
    let (lo, hi) = trap_bounds(n, &a.config.trap_ratio_range);
    let traps = trap_positions.len();
    if traps < lo || traps > hi {
      v.push(Violation::new("trap_ratio", format!("{lo}..={hi} of {n}"), traps));
    }
    for p in &trap_positions {
      if *p == 0 || *p == n - 1 {
        v.push(Violation::new("trap_position", "interior position", format!("position {p}")));
      }
    }
    for w in trap_positions.windows(2) {
      if w[1] == w[0] + 1 {
        v.push(Violation::new("trap_adjacency", "traps separated by another item", format!("positions {} and {}", w[0], w[1])));
      }
    }
  }

  let valid = v.is_empty();
  debug!(target: "composer", valid, violations = v.len(), relaxed = relaxed.len(), "Validated test");
  ValidationReport { valid, violations: v, relaxed }
}
