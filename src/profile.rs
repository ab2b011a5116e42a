//! Learner profile derived from the attempt log, and what the adaptive
//! composer does with it: a biased quota config and a difficulty curve.
//!
//! The profile is always recomputed from the full log; there is no
//! incremental update path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{AttemptRecord, CompositionConfig, CompositionPlan, DifficultyLabel, Subject};
use crate::error::{ComposeError, ComposeResult};
use crate::quota::apply_weakness_bias;

/// Classification and curve thresholds. Accuracies are percentages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveThresholds {
  /// A subject is weak below this accuracy.
  pub weak_below: f64,
  /// A subject is strong above this accuracy.
  pub strong_above: f64,
  pub min_attempts: usize,
  /// Largest minimum uplift for a weak subject, as a fraction of its minimum.
  pub max_uplift: f64,
  /// Overall accuracy below which the curve front-loads easy items.
  pub easy_front_below: f64,
  /// Overall accuracy above which the curve front-loads hard items.
  pub hard_front_above: f64,
}

impl Default for AdaptiveThresholds {
  fn default() -> Self {
    Self { weak_below: 60.0, strong_above: 75.0, min_attempts: 3, max_uplift: 0.30, easy_front_below: 50.0, hard_front_above: 70.0 }
  }
}

impl AdaptiveThresholds {
  pub fn validate(&self) -> Result<(), ComposeError> {
    let pct = 0.0..=100.0;
    if !pct.contains(&self.weak_below) || !pct.contains(&self.strong_above) || self.weak_below > self.strong_above {
      return Err(ComposeError::InvalidConfig("weak_below and strong_above must be ordered percentages".into()));
    }
    if !pct.contains(&self.easy_front_below) || !pct.contains(&self.hard_front_above) || self.easy_front_below > self.hard_front_above {
      return Err(ComposeError::InvalidConfig("curve thresholds must be ordered percentages".into()));
    }
    if !(0.0..=1.0).contains(&self.max_uplift) {
      return Err(ComposeError::InvalidConfig("max_uplift must be within 0..=1".into()));
    }
    if self.min_attempts == 0 {
      return Err(ComposeError::InvalidConfig("min_attempts must be positive".into()));
    }
    Ok(())
  }
}

/// One weak or strong subject with its topics ranked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
  pub subject: Subject,
  /// Weakest first for weak areas, strongest first for strong ones.
  pub topics: Vec<String>,
  /// Accuracy in percent.
  pub average_score: f64,
  pub attempts: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
  pub weak_areas: Vec<AreaSummary>,
  pub strong_areas: Vec<AreaSummary>,
  /// Percent correct over the whole log; 0 for an empty log.
  pub overall_accuracy: f64,
  pub average_time_per_item: f64,
  pub attempt_history: Vec<AttemptRecord>,
}

#[derive(Default)]
struct Tally {
  correct: usize,
  total: usize,
}

impl Tally {
  fn add(&mut self, correct: bool) {
    self.total += 1;
    if correct {
      self.correct += 1;
    }
  }

  fn pct(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.correct as f64 * 100.0 / self.total as f64
    }
  }
}

fn ranked_topics(topics: &BTreeMap<&str, Tally>, weakest_first: bool) -> Vec<String> {
  let mut list: Vec<(&str, f64)> = topics.iter().map(|(t, tally)| (*t, tally.pct())).collect();
  list.sort_by(|a, b| {
    let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
    let ord = if weakest_first { ord } else { ord.reverse() };
    ord.then(a.0.cmp(b.0))
  });
  list.into_iter().map(|(t, _)| t.to_string()).collect()
}

impl LearnerProfile {
  #[instrument(level = "debug", skip_all, fields(attempts = attempts.len()))]
  pub fn from_attempts(attempts: &[AttemptRecord], thresholds: &AdaptiveThresholds) -> LearnerProfile {
    let mut overall = Tally::default();
    let mut time = 0.0;
    let mut subjects: BTreeMap<Subject, (Tally, BTreeMap<&str, Tally>)> = BTreeMap::new();
    for a in attempts {
      overall.add(a.correct);
      time += a.time_spent_secs.max(0.0);
      let (tally, topics) = subjects.entry(a.subject).or_default();
      tally.add(a.correct);
      topics.entry(a.topic.as_str()).or_default().add(a.correct);
    }

    let mut weak_areas = vec![];
    let mut strong_areas = vec![];
    for (subject, (tally, topics)) in &subjects {
      if tally.total < thresholds.min_attempts {
        continue;
      }
      let average_score = tally.pct();
      if average_score < thresholds.weak_below {
        weak_areas.push(AreaSummary { subject: *subject, topics: ranked_topics(topics, true), average_score, attempts: tally.total });
      } else if average_score > thresholds.strong_above {
        strong_areas.push(AreaSummary { subject: *subject, topics: ranked_topics(topics, false), average_score, attempts: tally.total });
      }
    }
    weak_areas.sort_by(|a, b| a.average_score.partial_cmp(&b.average_score).unwrap_or(std::cmp::Ordering::Equal));
    strong_areas.sort_by(|a, b| b.average_score.partial_cmp(&a.average_score).unwrap_or(std::cmp::Ordering::Equal));

    let average_time_per_item = if attempts.is_empty() { 0.0 } else { time / attempts.len() as f64 };
    debug!(target: "profile", weak = weak_areas.len(), strong = strong_areas.len(), accuracy = overall.pct(), "Profile computed");
    LearnerProfile {
      weak_areas,
      strong_areas,
      overall_accuracy: overall.pct(),
      average_time_per_item,
      attempt_history: attempts.to_vec(),
    }
  }

  pub fn is_weak(&self, subject: Subject) -> bool {
    self.weak_areas.iter().any(|a| a.subject == subject)
  }

  /// `config` with every weak subject's quota raised in proportion to how far
  /// below the weak threshold it sits.
  pub fn bias_config(&self, config: &CompositionConfig, thresholds: &AdaptiveThresholds) -> ComposeResult<CompositionConfig> {
    let weak: Vec<(Subject, f64)> = self
      .weak_areas
      .iter()
      .map(|a| {
        let severity = if thresholds.weak_below > 0.0 { (thresholds.weak_below - a.average_score) / thresholds.weak_below } else { 0.0 };
        (a.subject, severity)
      })
      .collect();
    apply_weakness_bias(config, &weak, thresholds.max_uplift)
  }

  /// Target label per position for the plan's difficulty counts.
  pub fn difficulty_curve(&self, plan: &CompositionPlan, thresholds: &AdaptiveThresholds) -> Vec<DifficultyLabel> {
    let count = |l: DifficultyLabel| plan.difficulty_counts.get(&l).copied().unwrap_or(0);
    let blocks = |order: [DifficultyLabel; 3]| order.iter().flat_map(|l| std::iter::repeat(*l).take(count(*l))).collect::<Vec<_>>();
    if self.overall_accuracy < thresholds.easy_front_below {
      blocks([DifficultyLabel::Easy, DifficultyLabel::Medium, DifficultyLabel::Hard])
    } else if self.overall_accuracy > thresholds.hard_front_above {
      blocks([DifficultyLabel::Hard, DifficultyLabel::Medium, DifficultyLabel::Easy])
    } else {
      interleave(&DifficultyLabel::ALL.map(|l| (l, count(l))))
    }
  }
}

/// Spread labels evenly: at each position pick the label furthest behind its
/// ideal share (largest remainder), earlier labels first on ties.
fn interleave(counts: &[(DifficultyLabel, usize)]) -> Vec<DifficultyLabel> {
  let n: usize = counts.iter().map(|c| c.1).sum();
  let mut placed = vec![0usize; counts.len()];
  let mut out = Vec::with_capacity(n);
  for k in 1..=n {
    let mut best: Option<(usize, f64)> = None;
    for (i, (_, c)) in counts.iter().enumerate() {
      if placed[i] >= *c {
        continue;
      }
      let lag = (k * c) as f64 / n as f64 - placed[i] as f64;
      if best.map_or(true, |(_, b)| lag > b + 1e-12) {
        best = Some((i, lag));
      }
    }
    if let Some((i, _)) = best {
      placed[i] += 1;
      out.push(counts[i].0);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn attempt(subject: Subject, topic: &str, correct: bool) -> AttemptRecord {
    AttemptRecord { item_id: format!("{subject}-{topic}"), subject, topic: topic.into(), correct, time_spent_secs: 60.0 }
  }

  fn log(subject: Subject, topic: &str, right: usize, wrong: usize) -> Vec<AttemptRecord> {
    let mut v: Vec<AttemptRecord> = (0..right).map(|_| attempt(subject, topic, true)).collect();
    v.extend((0..wrong).map(|_| attempt(subject, topic, false)));
    v
  }

  fn plan(easy: usize, medium: usize, hard: usize) -> CompositionPlan {
    CompositionPlan {
      target_size: easy + medium + hard,
      difficulty_counts: BTreeMap::from([(DifficultyLabel::Easy, easy), (DifficultyLabel::Medium, medium), (DifficultyLabel::Hard, hard)]),
      ..CompositionPlan::default()
    }
  }

  #[test]
  fn classifies_weak_and_strong_subjects() {
    let mut attempts = log(Subject::History, "revolt of 1857", 1, 3);
    attempts.extend(log(Subject::History, "mughal administration", 3, 3));
    attempts.extend(log(Subject::Polity, "parliament", 4, 0));
    attempts.extend(log(Subject::Economy, "banking", 0, 2));
    let p = LearnerProfile::from_attempts(&attempts, &AdaptiveThresholds::default());
    assert_eq!(p.weak_areas.len(), 1);
    assert_eq!(p.weak_areas[0].subject, Subject::History);
    assert_eq!(p.weak_areas[0].topics, vec!["revolt of 1857".to_string(), "mughal administration".to_string()]);
    assert_eq!(p.weak_areas[0].average_score, 40.0);
    assert_eq!(p.strong_areas.len(), 1);
    assert_eq!(p.strong_areas[0].subject, Subject::Polity);
    // Economy has too few attempts to classify.
    assert!(!p.is_weak(Subject::Economy));
    assert_eq!(p.overall_accuracy, 50.0);
    assert_eq!(p.average_time_per_item, 60.0);
  }

  #[test]
  fn empty_log_gives_an_empty_profile() {
    let p = LearnerProfile::from_attempts(&[], &AdaptiveThresholds::default());
    assert!(p.weak_areas.is_empty() && p.strong_areas.is_empty());
    assert_eq!(p.overall_accuracy, 0.0);
  }

  #[test]
  fn weak_history_raises_its_minimum_within_bound() {
    let attempts = log(Subject::History, "national movement", 2, 3);
    let p = LearnerProfile::from_attempts(&attempts, &AdaptiveThresholds::default());
    let config = CompositionConfig::prelims(100);
    let biased = p.bias_config(&config, &AdaptiveThresholds::default()).expect("biased");
    let before = config.constraint_for(Subject::History).map(|c| c.min_count).unwrap_or(0);
    let after = biased.constraint_for(Subject::History).map(|c| c.min_count).unwrap_or(0);
    assert!(after > before);
    assert!((after - before) as f64 <= (before as f64 * 0.30).floor().max(1.0));
  }

  #[test]
  fn curve_shapes_follow_overall_accuracy() {
    let th = AdaptiveThresholds::default();
    let plan = plan(2, 3, 1);
    let low = LearnerProfile { overall_accuracy: 30.0, ..LearnerProfile::default() };
    use DifficultyLabel::*;
    assert_eq!(low.difficulty_curve(&plan, &th), vec![Easy, Easy, Medium, Medium, Medium, Hard]);
    let high = LearnerProfile { overall_accuracy: 90.0, ..LearnerProfile::default() };
    assert_eq!(high.difficulty_curve(&plan, &th), vec![Hard, Medium, Medium, Medium, Easy, Easy]);
    let mid = LearnerProfile { overall_accuracy: 60.0, ..LearnerProfile::default() };
    assert_eq!(mid.difficulty_curve(&plan, &th), vec![Medium, Easy, Medium, Hard, Easy, Medium]);
  }

  #[test]
  fn thresholds_validate() {
    assert!(AdaptiveThresholds::default().validate().is_ok());
    let bad = AdaptiveThresholds { weak_below: 80.0, ..AdaptiveThresholds::default() };
    assert!(bad.validate().is_err());
  }

  proptest! {
    #[test]
    fn recomputation_is_pure(flags in proptest::collection::vec((0usize..7, any::<bool>()), 0..60)) {
      let attempts: Vec<AttemptRecord> = flags.iter().map(|(s, c)| attempt(Subject::ALL[*s], "t", *c)).collect();
      let th = AdaptiveThresholds::default();
      prop_assert_eq!(LearnerProfile::from_attempts(&attempts, &th), LearnerProfile::from_attempts(&attempts, &th));
    }

    #[test]
    fn curve_preserves_counts(e in 0usize..30, m in 0usize..60, h in 0usize..30, acc in 0.0f64..100.0) {
      let plan = plan(e, m, h);
      let p = LearnerProfile { overall_accuracy: acc, ..LearnerProfile::default() };
      let curve = p.difficulty_curve(&plan, &AdaptiveThresholds::default());
      prop_assert_eq!(curve.len(), e + m + h);
      prop_assert_eq!(curve.iter().filter(|l| **l == DifficultyLabel::Easy).count(), e);
      prop_assert_eq!(curve.iter().filter(|l| **l == DifficultyLabel::Hard).count(), h);
    }
  }
}
