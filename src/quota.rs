//! Exact bucket counts for a target size.
//!
//! Subjects: every bucket gets its minimum, then the rest is handed out one
//! at a time, round-robin in declaration order, to buckets below their max.
//! Difficulty: cumulative rounding, so easy + medium + hard is always N.
//! Traps: the middle of the trap range, clamped to what rounds into it.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::domain::{BucketConstraint, BucketKey, CompositionConfig, CompositionPlan, DifficultyLabel, Subject, TrapRatioRange};
use crate::error::{ComposeError, ComposeResult};
use crate::sequencer::max_trap_slots;

const EPS: f64 = 1e-9;

fn infeasible(bucket: BucketKey, reason: impl Into<String>) -> ComposeError {
  ComposeError::QuotaInfeasible { bucket, reason: reason.into() }
}

fn subject_of(c: &BucketConstraint) -> ComposeResult<Subject> {
  match c.dimension {
    BucketKey::Subject(s) => Ok(s),
    other => Err(ComposeError::InvalidConfig(format!("{other} cannot be used as a subject constraint"))),
  }
}

/// Inclusive integer bounds on the trap count for `n` items.
pub fn trap_bounds(n: usize, range: &TrapRatioRange) -> (usize, usize) {
  let lo = (n as f64 * range.min - EPS).ceil().max(0.0) as usize;
  let hi = (n as f64 * range.max + EPS).floor().max(0.0) as usize;
  (lo, hi)
}

fn check_subjects(config: &CompositionConfig) -> ComposeResult<Vec<(Subject, usize, usize)>> {
  let mut seen = BTreeSet::new();
  let mut out = Vec::with_capacity(config.subject_constraints.len());
  for c in &config.subject_constraints {
    let subject = subject_of(c)?;
    if !seen.insert(subject) {
      return Err(ComposeError::InvalidConfig(format!("subject {subject} is constrained twice")));
    }
    if c.min_count > c.max_count {
      return Err(infeasible(c.dimension, format!("min {} exceeds max {}", c.min_count, c.max_count)));
    }
    out.push((subject, c.min_count, c.max_count));
  }
  if out.is_empty() {
    return Err(ComposeError::InvalidConfig("no subject constraints".into()));
  }
  Ok(out)
}

fn allocate_subjects(n: usize, buckets: &[(Subject, usize, usize)]) -> ComposeResult<BTreeMap<Subject, usize>> {
  let sum_min: usize = buckets.iter().map(|b| b.1).sum();
  let sum_max: usize = buckets.iter().map(|b| b.2).sum();
  if sum_min > n {
    let (s, min, _) = buckets.iter().copied().max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0))).unwrap_or(buckets[0]);
    return Err(infeasible(
      BucketKey::Subject(s),
      format!("sum of minimums {sum_min} exceeds target {n} (largest minimum {min})"),
    ));
  }
  if sum_max < n {
    let (s, _, max) = buckets.iter().copied().max_by(|a, b| a.2.cmp(&b.2).then(b.0.cmp(&a.0))).unwrap_or(buckets[0]);
    return Err(infeasible(
      BucketKey::Subject(s),
      format!("sum of maximums {sum_max} is below target {n} (largest maximum {max})"),
    ));
  }

  let mut counts: Vec<usize> = buckets.iter().map(|b| b.1).collect();
  let mut left = n - sum_min;
  while left > 0 {
    for (i, (_, _, max)) in buckets.iter().enumerate() {
      if left == 0 {
        break;
      }
      if counts[i] < *max {
        counts[i] += 1;
        left -= 1;
      }
    }
  }
  Ok(buckets.iter().zip(counts).map(|((s, _, _), c)| (*s, c)).collect())
}

fn allocate_difficulty(n: usize, config: &CompositionConfig) -> ComposeResult<BTreeMap<DifficultyLabel, usize>> {
  let ratio = config.difficulty_ratio;
  for label in DifficultyLabel::ALL {
    let share = ratio.share(label);
    if !share.is_finite() || share < 0.0 {
      return Err(infeasible(BucketKey::Difficulty(label), format!("share {share} is not a non-negative number")));
    }
  }
  let total = ratio.easy + ratio.medium + ratio.hard;
  if total <= EPS {
    return Err(infeasible(BucketKey::Difficulty(DifficultyLabel::Hard), "difficulty shares sum to zero"));
  }
  let cumulative = |share: f64| ((n as f64 * share / total).round() as usize).min(n);
  let easy = cumulative(ratio.easy);
  let easy_medium = cumulative(ratio.easy + ratio.medium).max(easy);
  Ok(BTreeMap::from([
    (DifficultyLabel::Easy, easy),
    (DifficultyLabel::Medium, easy_medium - easy),
    (DifficultyLabel::Hard, n - easy_medium),
  ]))
}

fn trap_target(n: usize, range: &TrapRatioRange) -> ComposeResult<usize> {
  if !(0.0..=1.0).contains(&range.min) || !(0.0..=1.0).contains(&range.max) || range.min > range.max {
    return Err(infeasible(BucketKey::TrapItems, format!("invalid trap range {}..={}", range.min, range.max)));
  }
  let (lo, hi) = trap_bounds(n, range);
  let hi = hi.min(max_trap_slots(n));
  if lo > hi {
    return Err(infeasible(
      BucketKey::TrapItems,
      format!("no trap count fits {:.0}%..{:.0}% of {n} items with interior, non-adjacent placement", range.min * 100.0, range.max * 100.0),
    ));
  }
  let mid = (n as f64 * (range.min + range.max) / 2.0).round() as usize;
  Ok(mid.clamp(lo, hi))
}

/// Compute the exact plan for `config`.
#[instrument(level = "debug", skip_all, fields(target = config.target_size))]
pub fn allocate(config: &CompositionConfig) -> ComposeResult<CompositionPlan> {
  let n = config.target_size;
  if n == 0 {
    return Err(ComposeError::InvalidConfig("target_size must be positive".into()));
  }
  let buckets = check_subjects(config)?;
  let subject_counts = allocate_subjects(n, &buckets)?;
  let difficulty_counts = allocate_difficulty(n, config)?;
  let trap_target = trap_target(n, &config.trap_ratio_range)?;
  debug!(target: "composer", ?subject_counts, ?difficulty_counts, trap_target, "Quota allocated");
  Ok(CompositionPlan { target_size: n, subject_counts, difficulty_counts, trap_target })
}

/// Raise each weak subject's minimum (and maximum) by a bounded uplift.
///
/// `weak` pairs a subject with a severity in `0..=1`. The uplift is
/// `round(min × max_uplift × severity)`, at least 1 and at most
/// `max(1, floor(min × max_uplift))`. When the raised minimums overshoot the
/// target, the other subjects' minimums shrink in proportion (largest
/// remainder, declaration order on ties).
pub fn apply_weakness_bias(config: &CompositionConfig, weak: &[(Subject, f64)], max_uplift: f64) -> ComposeResult<CompositionConfig> {
  let mut out = config.clone();
  let mut raised: BTreeSet<Subject> = BTreeSet::new();
  for (subject, severity) in weak {
    let Some(c) = out.subject_constraints.iter_mut().find(|c| c.dimension == BucketKey::Subject(*subject)) else {
      continue;
    };
    let severity = severity.clamp(0.0, 1.0);
    let min = c.min_count as f64;
    let cap = ((min * max_uplift).floor() as usize).max(1);
    let uplift = ((min * max_uplift * severity).round() as usize).clamp(1, cap);
    c.min_count += uplift;
    c.max_count += uplift;
    raised.insert(*subject);
    debug!(target: "profile", subject = %subject, uplift, min = c.min_count, max = c.max_count, "Biased weak subject");
  }

  let n = out.target_size;
  let sum_min: usize = out.subject_constraints.iter().map(|c| c.min_count).sum();
  if sum_min <= n {
    return Ok(out);
  }
  let excess = sum_min - n;
  let others: Vec<usize> = out
    .subject_constraints
    .iter()
    .enumerate()
    .filter(|(_, c)| !matches!(c.dimension, BucketKey::Subject(s) if raised.contains(&s)))
    .map(|(i, _)| i)
    .collect();
  let reducible: usize = others.iter().map(|&i| out.subject_constraints[i].min_count).sum();
  if reducible < excess {
    let bucket = out.subject_constraints.first().map(|c| c.dimension).unwrap_or(BucketKey::TrapItems);
    return Err(infeasible(bucket, format!("biased minimums exceed target {n} by {excess}")));
  }

  let mut cuts: Vec<(usize, usize, f64)> = others
    .iter()
    .map(|&i| {
      let exact = excess as f64 * out.subject_constraints[i].min_count as f64 / reducible as f64;
      (i, exact.floor() as usize, exact - exact.floor())
    })
    .collect();
  let mut left = excess - cuts.iter().map(|c| c.1).sum::<usize>();
  let mut by_remainder: Vec<usize> = (0..cuts.len()).collect();
  by_remainder.sort_by(|&a, &b| cuts[b].2.partial_cmp(&cuts[a].2).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b)));
  for k in by_remainder {
    if left == 0 {
      break;
    }
    if cuts[k].1 < out.subject_constraints[cuts[k].0].min_count {
      cuts[k].1 += 1;
      left -= 1;
    }
  }
  for (i, cut, _) in cuts {
    out.subject_constraints[i].min_count -= cut;
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn hundred_item_ranges(target: usize) -> CompositionConfig {
    CompositionConfig { target_size: target, ..CompositionConfig::prelims(100) }
  }

  #[test]
  fn prelims_plan_for_a_hundred_items() {
    let plan = allocate(&CompositionConfig::prelims(100)).expect("plan");
    let subjects: Vec<usize> = Subject::ALL.iter().map(|s| plan.subject_counts[s]).collect();
    assert_eq!(subjects, vec![18, 16, 13, 14, 10, 7, 22]);
    assert_eq!(plan.count_for(BucketKey::Difficulty(DifficultyLabel::Easy)), 25);
    assert_eq!(plan.count_for(BucketKey::Difficulty(DifficultyLabel::Medium)), 55);
    assert_eq!(plan.count_for(BucketKey::Difficulty(DifficultyLabel::Hard)), 20);
    assert_eq!(plan.trap_target, 10);
  }

  #[test]
  fn target_beyond_maximums_is_infeasible() {
    match allocate(&hundred_item_ranges(210)) {
      Err(ComposeError::QuotaInfeasible { bucket: BucketKey::Subject(s), reason }) => {
        assert_eq!(s, Subject::CurrentAffairs);
        assert!(reason.contains("121"), "{reason}");
      }
      other => panic!("expected infeasible, got {other:?}"),
    }
  }

  #[test]
  fn target_below_minimums_is_infeasible() {
    assert!(matches!(allocate(&hundred_item_ranges(50)), Err(ComposeError::QuotaInfeasible { .. })));
  }

  #[test]
  fn inverted_range_names_the_bucket() {
    let mut config = CompositionConfig::prelims(100);
    config.subject_constraints[2].min_count = 20;
    config.subject_constraints[2].max_count = 10;
    match allocate(&config) {
      Err(ComposeError::QuotaInfeasible { bucket, .. }) => assert_eq!(bucket, BucketKey::Subject(Subject::Geography)),
      other => panic!("{other:?}"),
    }
  }

  #[test]
  fn bad_ratio_names_a_difficulty_bucket() {
    let mut config = CompositionConfig::prelims(100);
    config.difficulty_ratio.medium = -0.1;
    assert!(matches!(
      allocate(&config),
      Err(ComposeError::QuotaInfeasible { bucket: BucketKey::Difficulty(DifficultyLabel::Medium), .. })
    ));
    config.difficulty_ratio = crate::domain::DifficultyRatio { easy: 0.0, medium: 0.0, hard: 0.0 };
    assert!(matches!(allocate(&config), Err(ComposeError::QuotaInfeasible { bucket: BucketKey::Difficulty(_), .. })));
  }

  #[test]
  fn half_shares_on_odd_targets_still_sum_to_the_target() {
    for n in [3usize, 21] {
      let config = CompositionConfig {
        target_size: n,
        subject_constraints: vec![BucketConstraint::subject(Subject::Polity, 0, n)],
        difficulty_ratio: crate::domain::DifficultyRatio { easy: 0.5, medium: 0.5, hard: 0.0 },
        trap_ratio_range: TrapRatioRange { min: 0.0, max: 0.5 },
        ..CompositionConfig::prelims(100)
      };
      let plan = allocate(&config).expect("plan");
      let easy = plan.count_for(BucketKey::Difficulty(DifficultyLabel::Easy));
      let medium = plan.count_for(BucketKey::Difficulty(DifficultyLabel::Medium));
      assert_eq!((easy, medium), ((n + 1) / 2, n / 2));
      assert_eq!(plan.count_for(BucketKey::Difficulty(DifficultyLabel::Hard)), 0);
      assert_eq!(plan.difficulty_total(), n);
    }
  }

  #[test]
  fn tiny_tests_cannot_hold_traps() {
    let config = CompositionConfig {
      target_size: 5,
      subject_constraints: vec![BucketConstraint::subject(Subject::Polity, 0, 5)],
      ..CompositionConfig::prelims(100)
    };
    assert!(matches!(allocate(&config), Err(ComposeError::QuotaInfeasible { bucket: BucketKey::TrapItems, .. })));
  }

  #[test]
  fn weak_subject_gets_bounded_uplift() {
    let config = CompositionConfig::prelims(100);
    let biased = apply_weakness_bias(&config, &[(Subject::History, 0.5)], 0.30).expect("biased");
    let history = biased.constraint_for(Subject::History).copied().expect("history");
    assert_eq!(history.min_count, 17);
    assert_eq!(history.max_count, 20);
    assert!(allocate(&biased).is_ok());
  }

  #[test]
  fn overshooting_minimums_shrink_the_others() {
    let mut config = CompositionConfig::prelims(100);
    config.subject_constraints[0].min_count = 20;
    config.subject_constraints[0].max_count = 30;
    // mins now sum to 99; a +6 uplift on Polity overshoots by 5
    let biased = apply_weakness_bias(&config, &[(Subject::Polity, 1.0)], 0.30).expect("biased");
    let mins: usize = biased.subject_constraints.iter().map(|c| c.min_count).sum();
    assert_eq!(mins, 100);
    assert_eq!(biased.constraint_for(Subject::Polity).map(|c| c.min_count), Some(26));
    assert!(allocate(&biased).is_ok());
  }

  proptest! {
    #[test]
    fn difficulty_counts_always_sum_to_the_target(n in 1usize..400, e in 0.0f64..1.0, m in 0.0f64..1.0, h in 0.01f64..1.0) {
      let config = CompositionConfig {
        target_size: n,
        difficulty_ratio: crate::domain::DifficultyRatio { easy: e, medium: m, hard: h },
        ..CompositionConfig::prelims(n)
      };
      let counts = allocate_difficulty(n, &config).expect("counts");
      prop_assert_eq!(counts.values().sum::<usize>(), n);
    }

    #[test]
    fn allocation_conserves_the_target(n in 1usize..400) {
      let config = CompositionConfig::prelims(n);
      if let Ok(plan) = allocate(&config) {
        prop_assert_eq!(plan.subject_total(), n);
        prop_assert_eq!(plan.difficulty_total(), n);
        for c in &config.subject_constraints {
          let got = plan.count_for(c.dimension);
          prop_assert!(got >= c.min_count && got <= c.max_count);
        }
        let (lo, hi) = trap_bounds(n, &config.trap_ratio_range);
        prop_assert!(plan.trap_target >= lo && plan.trap_target <= hi);
      }
    }

    #[test]
    fn halving_a_feasible_target_stays_feasible(n in (40usize..200).prop_map(|n| n * 2)) {
      if allocate(&CompositionConfig::prelims(n)).is_ok() {
        prop_assert!(allocate(&CompositionConfig::prelims(n / 2)).is_ok());
      }
    }
  }
}
