//! Ordering a selected item set under spacing rules.
//!
//! Flow:
//! 1) Trap items are pinned to evenly spaced interior slots; every other
//!    position takes a non-trap item.
//! 2) Interchangeable items (same subject, format, trap flag and label) are
//!    grouped into classes so the search branches over classes, not items.
//!    Classes from the fullest subject (then format) are tried first.
//! 3) Strict depth-first search with forward checks, bounded by
//!    `max_iterations`.
//! 4) If the strict search does not finish, a greedy pass relaxes rules in
//!    `relaxation_order` at the positions that need it and records each one.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::{BucketKey, CandidateItem, DifficultyLabel, ItemFormat, Relaxation, SpacingRule, Subject};
use crate::error::{ComposeError, ComposeResult};

/// Spacing parameters. All of them are tunables, not exam law.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencingRules {
  pub forbid_adjacent_format: bool,
  pub max_subject_run: usize,
  /// Longest run of statement-structured items.
  pub max_statement_run: usize,
  /// Other items required after a full statement run.
  pub min_statement_gap: usize,
  pub max_iterations: usize,
  pub allow_relaxation: bool,
  /// Rules relaxed first to last when the strict search fails.
  pub relaxation_order: Vec<SpacingRule>,
}

impl Default for SequencingRules {
  fn default() -> Self {
    Self {
      forbid_adjacent_format: true,
      max_subject_run: 2,
      max_statement_run: 3,
      min_statement_gap: 2,
      max_iterations: 50_000,
      allow_relaxation: true,
      relaxation_order: vec![SpacingRule::StatementRun, SpacingRule::SubjectRun, SpacingRule::FormatAdjacency],
    }
  }
}

impl SequencingRules {
  pub fn validate(&self) -> Result<(), ComposeError> {
    if self.max_subject_run == 0 || self.max_statement_run == 0 {
      return Err(ComposeError::InvalidConfig("run limits must be at least 1".into()));
    }
    if self.max_iterations == 0 {
      return Err(ComposeError::InvalidConfig("max_iterations must be positive".into()));
    }
    let mut seen = self.relaxation_order.clone();
    seen.sort();
    seen.dedup();
    if seen.len() != self.relaxation_order.len() || seen.len() != 3 {
      return Err(ComposeError::InvalidConfig(
        "relaxation_order must list format_adjacency, subject_run and statement_run exactly once".into(),
      ));
    }
    Ok(())
  }
}

/// Ordered result of one sequencing call.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequenced {
  pub items: Vec<CandidateItem>,
  pub relaxations: Vec<Relaxation>,
  pub iterations: usize,
}

/// Largest trap count that fits on interior, non-adjacent slots of an `n`-item test.
pub fn max_trap_slots(n: usize) -> usize {
  if n < 3 {
    0
  } else {
    (n - 1) / 2
  }
}

/// Evenly spaced interior slots for `traps` trap items: `round(k(n−1)/(traps+1))`
/// while that step is at least 2, otherwise stretched across `1..=n−2`.
pub fn trap_slots(n: usize, traps: usize) -> Vec<usize> {
  let traps = traps.min(max_trap_slots(n));
  if traps == 0 {
    return vec![];
  }
  let step = (n - 1) as f64 / (traps + 1) as f64;
  if traps == 1 || step >= 2.0 {
    return (1..=traps).map(|k| (k as f64 * step).round() as usize).collect();
  }
  (0..traps).map(|k| 1 + k * (n - 3) / (traps - 1)).collect()
}

/// Trailing state of a partial sequence.
#[derive(Clone, Copy, Debug, Default)]
struct Tail {
  last_format: Option<ItemFormat>,
  last_subject: Option<Subject>,
  subject_run: usize,
  statement_run: usize,
  cooldown: usize,
}

impl Tail {
  fn breaks(&self, subject: Subject, format: ItemFormat, rules: &SequencingRules) -> Vec<SpacingRule> {
    let mut out = vec![];
    if rules.forbid_adjacent_format && self.last_format == Some(format) {
      out.push(SpacingRule::FormatAdjacency);
    }
    if self.last_subject == Some(subject) && self.subject_run >= rules.max_subject_run {
      out.push(SpacingRule::SubjectRun);
    }
    if format.is_statement_structured() && (self.statement_run >= rules.max_statement_run || self.cooldown > 0) {
      out.push(SpacingRule::StatementRun);
    }
    out
  }

  fn after(mut self, subject: Subject, format: ItemFormat, rules: &SequencingRules) -> Tail {
    self.subject_run = if self.last_subject == Some(subject) { self.subject_run + 1 } else { 1 };
    self.last_subject = Some(subject);
    self.last_format = Some(format);
    if format.is_statement_structured() {
      self.statement_run += 1;
      if self.statement_run >= rules.max_statement_run {
        self.cooldown = rules.min_statement_gap;
      }
    } else {
      self.statement_run = 0;
      self.cooldown = self.cooldown.saturating_sub(1);
    }
    self
  }
}

/// Every (rule, position) where an ordered list breaks a spacing rule.
pub fn spacing_breaks(items: &[CandidateItem], rules: &SequencingRules) -> Vec<Relaxation> {
  let mut tail = Tail::default();
  let mut out = vec![];
  for (position, item) in items.iter().enumerate() {
    for rule in tail.breaks(item.subject, item.format, rules) {
      out.push(Relaxation { rule, position });
    }
    tail = tail.after(item.subject, item.format, rules);
  }
  out
}

struct Class {
  subject: Subject,
  format: ItemFormat,
  is_trap: bool,
  label: DifficultyLabel,
  members: Vec<usize>,
  next: usize,
}

impl Class {
  fn remaining(&self) -> usize {
    self.members.len() - self.next
  }
}

struct Board<'a> {
  rules: &'a SequencingRules,
  classes: Vec<Class>,
  trap_slot: Vec<bool>,
  curve: Option<&'a [DifficultyLabel]>,
  by_subject: [usize; Subject::ALL.len()],
  by_format: [usize; ItemFormat::ALL.len()],
  /// Remaining non-trap items; these only go on the gaps between trap slots.
  free_subject: [usize; Subject::ALL.len()],
  free_format: [usize; ItemFormat::ALL.len()],
  statements: usize,
  remaining: usize,
}

impl<'a> Board<'a> {
  fn new(items: &[CandidateItem], rules: &'a SequencingRules, trap_slot: Vec<bool>, curve: Option<&'a [DifficultyLabel]>) -> Self {
    let mut classes: Vec<Class> = vec![];
    let mut by_subject = [0usize; Subject::ALL.len()];
    let mut by_format = [0usize; ItemFormat::ALL.len()];
    let mut free_subject = [0usize; Subject::ALL.len()];
    let mut free_format = [0usize; ItemFormat::ALL.len()];
    let mut statements = 0;
    for (idx, item) in items.iter().enumerate() {
      by_subject[item.subject as usize] += 1;
      by_format[item.format as usize] += 1;
      if !item.is_trap {
        free_subject[item.subject as usize] += 1;
        free_format[item.format as usize] += 1;
      }
      if item.format.is_statement_structured() {
        statements += 1;
      }
      let found = classes.iter_mut().find(|c| {
        c.subject == item.subject && c.format == item.format && c.is_trap == item.is_trap && c.label == item.difficulty_label
      });
      match found {
        Some(c) => c.members.push(idx),
        None => classes.push(Class {
          subject: item.subject,
          format: item.format,
          is_trap: item.is_trap,
          label: item.difficulty_label,
          members: vec![idx],
          next: 0,
        }),
      }
    }
    Self {
      rules,
      classes,
      trap_slot,
      curve,
      by_subject,
      by_format,
      free_subject,
      free_format,
      statements,
      remaining: items.len(),
    }
  }

  fn take(&mut self, c: usize) -> usize {
    let class = &mut self.classes[c];
    let idx = class.members[class.next];
    class.next += 1;
    self.by_subject[class.subject as usize] -= 1;
    self.by_format[class.format as usize] -= 1;
    if !class.is_trap {
      self.free_subject[class.subject as usize] -= 1;
      self.free_format[class.format as usize] -= 1;
    }
    if class.format.is_statement_structured() {
      self.statements -= 1;
    }
    self.remaining -= 1;
    idx
  }

  fn untake(&mut self, c: usize) {
    let class = &mut self.classes[c];
    class.next -= 1;
    self.by_subject[class.subject as usize] += 1;
    self.by_format[class.format as usize] += 1;
    if !class.is_trap {
      self.free_subject[class.subject as usize] += 1;
      self.free_format[class.format as usize] += 1;
    }
    if class.format.is_statement_structured() {
      self.statements += 1;
    }
    self.remaining += 1;
  }

  /// Lengths of the runs of non-trap positions from `from` to the end. The
  /// flag is set when the first run starts at `from` and so touches the tail.
  fn free_segments(&self, from: usize) -> (Vec<usize>, bool) {
    let mut out = vec![];
    let mut len = 0usize;
    for q in from..self.trap_slot.len() {
      if self.trap_slot[q] {
        if len > 0 {
          out.push(len);
        }
        len = 0;
      } else {
        len += 1;
      }
    }
    if len > 0 {
      out.push(len);
    }
    let touches = self.trap_slot.get(from).map_or(false, |t| !t);
    (out, touches)
  }

  /// Non-trap items must fit the gaps between trap slots: at most `⌈L/2⌉`
  /// of one format and `L − ⌊L/(run+1)⌋` of one subject per gap of `L`.
  fn gaps_feasible(&self, segments: &[usize], touches: bool, tail: &Tail, ignored: &[SpacingRule]) -> bool {
    if self.rules.forbid_adjacent_format && !ignored.contains(&SpacingRule::FormatAdjacency) {
      for (fi, &count) in self.free_format.iter().enumerate() {
        if count == 0 {
          continue;
        }
        let after_tail = touches && tail.last_format.map(|f| f as usize) == Some(fi);
        let cap: usize = segments
          .iter()
          .enumerate()
          .map(|(k, &len)| if k == 0 && after_tail { len / 2 } else { (len + 1) / 2 })
          .sum();
        if count > cap {
          return false;
        }
      }
    }
    if !ignored.contains(&SpacingRule::SubjectRun) {
      let run = self.rules.max_subject_run;
      let cap: usize = segments.iter().map(|&len| len - len / (run + 1)).sum();
      if self.free_subject.iter().any(|&count| count > cap) {
        return false;
      }
    }
    true
  }

  /// Necessary conditions for finishing the remainder from `tail`.
  fn remainder_feasible(&self, tail: &Tail, ignored: &[SpacingRule]) -> bool {
    let r = self.remaining;
    if self.rules.forbid_adjacent_format && !ignored.contains(&SpacingRule::FormatAdjacency) {
      for (fi, &count) in self.by_format.iter().enumerate() {
        let cap = if tail.last_format.map(|f| f as usize) == Some(fi) { r / 2 } else { (r + 1) / 2 };
        if count > cap {
          return false;
        }
      }
    }
    if !ignored.contains(&SpacingRule::SubjectRun) {
      let run = self.rules.max_subject_run;
      for (si, &count) in self.by_subject.iter().enumerate() {
        if count == 0 {
          continue;
        }
        let others = r - count;
        let cap = if tail.last_subject.map(|s| s as usize) == Some(si) {
          run.saturating_sub(tail.subject_run) + run * others
        } else {
          run * (others + 1)
        };
        if count > cap {
          return false;
        }
      }
    }
    if !ignored.contains(&SpacingRule::StatementRun) {
      let others = r - self.statements;
      if self.statements > self.rules.max_statement_run * (others + 1) {
        return false;
      }
    }
    true
  }

  /// Whether some remaining trap item can still take the next trap slot
  /// after `position`, given the tail once `position` is filled.
  fn next_trap_reachable(&self, position: usize, tail: &Tail) -> bool {
    let Some(slot) = (position + 1..self.trap_slot.len()).find(|&q| self.trap_slot[q]) else {
      return true;
    };
    let distance = slot - position;
    self.classes.iter().filter(|c| c.is_trap && c.remaining() > 0).any(|c| {
      if distance == 1 {
        tail.breaks(c.subject, c.format, self.rules).is_empty()
      } else {
        !(c.format.is_statement_structured() && distance <= tail.cooldown)
      }
    })
  }

  /// Classes that may go at `position`, best first.
  fn options(&mut self, position: usize, tail: &Tail, ignored: &[SpacingRule], forward: bool) -> Vec<usize> {
    let want_trap = self.trap_slot[position];
    let (segments, touches) = if forward { self.free_segments(position + 1) } else { (vec![], false) };
    let mut out: Vec<usize> = vec![];
    for c in 0..self.classes.len() {
      let class = &self.classes[c];
      if class.remaining() == 0 || class.is_trap != want_trap {
        continue;
      }
      let (subject, format) = (class.subject, class.format);
      if tail.breaks(subject, format, self.rules).iter().any(|r| !ignored.contains(r)) {
        continue;
      }
      if forward {
        self.take(c);
        let after = tail.after(subject, format, self.rules);
        let ok = self.remainder_feasible(&after, ignored)
          && self.gaps_feasible(&segments, touches, &after, ignored)
          && self.next_trap_reachable(position, &after);
        self.untake(c);
        if !ok {
          continue;
        }
      }
      out.push(c);
    }
    let target = self.curve.and_then(|curve| curve.get(position).copied());
    out.sort_by_key(|&c| {
      let class = &self.classes[c];
      let (subject, format) = self.pressure(class);
      (target.map_or(false, |t| t != class.label), Reverse(subject), Reverse(format), class.members[class.next])
    });
    out
  }

  /// Remaining items competing for the same kind of slot, by subject and by
  /// format. The fullest buckets go first so they are not left for the end.
  fn pressure(&self, class: &Class) -> (usize, usize) {
    let (s, f) = (class.subject as usize, class.format as usize);
    if class.is_trap {
      (self.by_subject[s] - self.free_subject[s], self.by_format[f] - self.free_format[f])
    } else {
      (self.free_subject[s], self.free_format[f])
    }
  }
}

struct Frame {
  options: Vec<usize>,
  cursor: usize,
  before: Tail,
}

enum Strict {
  Done(Vec<usize>),
  Stuck { deepest: usize },
}

fn strict_search(board: &mut Board<'_>, n: usize, iterations: &mut usize) -> Strict {
  let rules = board.rules;
  let mut order: Vec<usize> = Vec::with_capacity(n);
  let mut placed: Vec<usize> = Vec::with_capacity(n);
  let mut deepest = 0usize;
  let first = board.options(0, &Tail::default(), &[], true);
  let mut frames = vec![Frame { options: first, cursor: 0, before: Tail::default() }];

  while let Some(frame) = frames.last_mut() {
    if frame.cursor >= frame.options.len() {
      frames.pop();
      if let Some(c) = order.pop() {
        placed.pop();
        board.untake(c);
      }
      continue;
    }
    if *iterations >= rules.max_iterations {
      return Strict::Stuck { deepest };
    }
    *iterations += 1;

    let c = frame.options[frame.cursor];
    frame.cursor += 1;
    let before = frame.before;
    let (subject, format) = (board.classes[c].subject, board.classes[c].format);
    placed.push(board.take(c));
    order.push(c);
    deepest = deepest.max(order.len());
    if order.len() == n {
      return Strict::Done(placed);
    }
    let tail = before.after(subject, format, rules);
    let options = board.options(order.len(), &tail, &[], true);
    frames.push(Frame { options, cursor: 0, before: tail });
  }
  Strict::Stuck { deepest }
}

fn relaxed_pass(board: &mut Board<'_>, n: usize) -> Option<(Vec<usize>, Vec<Relaxation>)> {
  let rules = board.rules;
  let mut tail = Tail::default();
  let mut placed = Vec::with_capacity(n);
  let mut relaxations = vec![];
  for position in 0..n {
    let mut pick = board.options(position, &tail, &[], true).first().copied();
    if pick.is_none() {
      pick = board.options(position, &tail, &[], false).first().copied();
    }
    let mut tier = 0;
    while pick.is_none() && tier < rules.relaxation_order.len() {
      tier += 1;
      pick = board.options(position, &tail, &rules.relaxation_order[..tier], false).first().copied();
    }
    let c = pick?;
    let (subject, format) = (board.classes[c].subject, board.classes[c].format);
    for rule in tail.breaks(subject, format, rules) {
      debug!(target: "sequencer", position, rule = rule.as_str(), "Relaxed spacing rule");
      relaxations.push(Relaxation { rule, position });
    }
    placed.push(board.take(c));
    tail = tail.after(subject, format, rules);
  }
  Some((placed, relaxations))
}

/// Order `items` (selection order) under `rules`, optionally steering each
/// position toward `curve`'s difficulty label.
#[instrument(level = "info", skip_all, fields(items = items.len(), adaptive = curve.is_some()))]
pub fn sequence(items: &[CandidateItem], rules: &SequencingRules, curve: Option<&[DifficultyLabel]>) -> ComposeResult<Sequenced> {
  rules.validate()?;
  let n = items.len();
  if let Some(curve) = curve {
    if curve.len() != n {
      return Err(ComposeError::InvalidConfig(format!("difficulty curve has {} slots for {n} items", curve.len())));
    }
  }
  if n == 0 {
    return Ok(Sequenced { items: vec![], relaxations: vec![], iterations: 0 });
  }
  let traps = items.iter().filter(|i| i.is_trap).count();
  if traps > max_trap_slots(n) {
    return Err(ComposeError::QuotaInfeasible {
      bucket: BucketKey::TrapItems,
      reason: format!("{traps} trap items cannot be spaced across {n} positions"),
    });
  }
  let mut trap_slot = vec![false; n];
  for slot in trap_slots(n, traps) {
    trap_slot[slot] = true;
  }

  let mut board = Board::new(items, rules, trap_slot.clone(), curve);
  let mut iterations = 0usize;
  let (order, relaxations) = match strict_search(&mut board, n, &mut iterations) {
    Strict::Done(order) => (order, vec![]),
    Strict::Stuck { deepest } => {
      if !rules.allow_relaxation {
        warn!(target: "sequencer", deepest, total = n, iterations, "Strict sequencing failed and relaxation is disabled");
        return Err(ComposeError::SequencingTimeout { placed: deepest, total: n, iterations });
      }
      let mut board = Board::new(items, rules, trap_slot, curve);
      match relaxed_pass(&mut board, n) {
        Some(found) => found,
        None => return Err(ComposeError::SequencingTimeout { placed: deepest, total: n, iterations }),
      }
    }
  };
  info!(target: "sequencer", items = n, traps, iterations, relaxed = relaxations.len(), "Sequenced test");
  Ok(Sequenced { items: order.into_iter().map(|i| items[i].clone()).collect(), relaxations, iterations })
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn item(id: &str, subject: Subject, format: ItemFormat, is_trap: bool) -> CandidateItem {
    CandidateItem {
      id: id.into(),
      subject,
      topic: "t".into(),
      format,
      raw_difficulty_score: 50.0,
      difficulty_label: DifficultyLabel::Medium,
      concept_tags: ["c".to_string()].into_iter().collect(),
      quality_score: 90.0,
      is_trap,
      content: None,
    }
  }

  fn mixed(n: usize, traps: usize) -> Vec<CandidateItem> {
    const FORMATS: [ItemFormat; 5] = [
      ItemFormat::SingleCorrect,
      ItemFormat::MatchPairs,
      ItemFormat::StatementBased,
      ItemFormat::MapBased,
      ItemFormat::DataBased,
    ];
    (0..n)
      .map(|i| {
        let trap = i < traps;
        let format = if trap { ItemFormat::OddOneOut } else { FORMATS[i % FORMATS.len()] };
        item(&format!("q{i}"), Subject::ALL[i % 4], format, trap)
      })
      .collect()
  }

  #[test]
  fn default_rules_validate_and_bad_orders_do_not() {
    assert!(SequencingRules::default().validate().is_ok());
    let rules = SequencingRules {
      relaxation_order: vec![SpacingRule::SubjectRun, SpacingRule::SubjectRun, SpacingRule::FormatAdjacency],
      ..SequencingRules::default()
    };
    assert!(matches!(rules.validate(), Err(ComposeError::InvalidConfig(_))));
  }

  #[test]
  fn trap_slots_for_a_hundred_items() {
    assert_eq!(trap_slots(100, 10), vec![9, 18, 27, 36, 45, 54, 63, 72, 81, 90]);
    assert!(trap_slots(100, 0).is_empty());
    assert_eq!(max_trap_slots(100), 49);
    assert_eq!(max_trap_slots(2), 0);
  }

  #[test]
  fn small_tests_use_every_interior_slot() {
    assert_eq!(max_trap_slots(3), 1);
    assert_eq!(max_trap_slots(4), 1);
    assert_eq!(max_trap_slots(5), 2);
    assert_eq!(trap_slots(3, 1), vec![1]);
    assert_eq!(trap_slots(5, 2), vec![1, 3]);
    assert_eq!(trap_slots(6, 2), vec![1, 4]);
    assert_eq!(trap_slots(7, 3), vec![1, 3, 5]);
  }

  #[test]
  fn dominant_subject_is_not_left_for_the_end() {
    let mut items = vec![];
    for i in 0..30 {
      let (subject, trap) = match i {
        0..=13 => (Subject::CurrentAffairs, false),
        14..=16 => (Subject::ALL[i % 4], true),
        _ => (Subject::ALL[i % 4], false),
      };
      let format = if trap { ItemFormat::OddOneOut } else { [ItemFormat::SingleCorrect, ItemFormat::MatchPairs, ItemFormat::MapBased][i % 3] };
      items.push(item(&format!("q{i}"), subject, format, trap));
    }
    let rules = SequencingRules::default();
    let out = sequence(&items, &rules, None).expect("sequenced");
    assert!(out.relaxations.is_empty(), "{:?}", out.relaxations);
    assert!(spacing_breaks(&out.items, &rules).is_empty());
    let tail_run = out.items.iter().rev().take_while(|i| i.subject == Subject::CurrentAffairs).count();
    assert!(tail_run <= rules.max_subject_run);
  }

  #[test]
  fn feasible_set_is_sequenced_without_relaxation() {
    let items = mixed(30, 3);
    let out = sequence(&items, &SequencingRules::default(), None).expect("sequenced");
    assert_eq!(out.items.len(), 30);
    assert!(out.relaxations.is_empty());
    assert!(spacing_breaks(&out.items, &SequencingRules::default()).is_empty());
    let trap_positions: Vec<usize> = out.items.iter().enumerate().filter(|(_, i)| i.is_trap).map(|(p, _)| p).collect();
    assert_eq!(trap_positions, trap_slots(30, 3));
  }

  #[test]
  fn impossible_set_records_relaxations_in_order() {
    let items: Vec<CandidateItem> = (0..4).map(|i| item(&format!("q{i}"), Subject::Polity, ItemFormat::SingleCorrect, false)).collect();
    let out = sequence(&items, &SequencingRules::default(), None).expect("relaxed");
    assert_eq!(out.items.len(), 4);
    assert!(out.relaxations.contains(&Relaxation { rule: SpacingRule::FormatAdjacency, position: 1 }));
    assert!(out.relaxations.contains(&Relaxation { rule: SpacingRule::SubjectRun, position: 2 }));
    assert!(out.relaxations.iter().all(|r| r.rule != SpacingRule::StatementRun));
    assert_eq!(out.relaxations, spacing_breaks(&out.items, &SequencingRules::default()));
  }

  #[test]
  fn disabled_relaxation_times_out() {
    let items: Vec<CandidateItem> = (0..4).map(|i| item(&format!("q{i}"), Subject::Polity, ItemFormat::SingleCorrect, false)).collect();
    let rules = SequencingRules { allow_relaxation: false, ..SequencingRules::default() };
    match sequence(&items, &rules, None) {
      Err(ComposeError::SequencingTimeout { placed, total, .. }) => {
        assert_eq!(total, 4);
        assert!(placed < 4);
      }
      other => panic!("expected timeout, got {other:?}"),
    }
  }

  #[test]
  fn statement_cooldown_is_enforced() {
    let rules = SequencingRules::default();
    let seq = vec![
      item("a", Subject::Polity, ItemFormat::StatementBased, false),
      item("b", Subject::History, ItemFormat::MultipleCorrect, false),
      item("c", Subject::Economy, ItemFormat::AssertionReason, false),
      item("d", Subject::Science, ItemFormat::SingleCorrect, false),
      item("e", Subject::Polity, ItemFormat::StatementBased, false),
    ];
    assert_eq!(spacing_breaks(&seq, &rules), vec![Relaxation { rule: SpacingRule::StatementRun, position: 4 }]);
  }

  #[test]
  fn curve_steers_labels_toward_the_front() {
    let mut items = mixed(12, 0);
    for (i, it) in items.iter_mut().enumerate() {
      if i % 3 == 0 {
        it.difficulty_label = DifficultyLabel::Easy;
        it.raw_difficulty_score = 20.0;
      }
    }
    let mut curve = vec![DifficultyLabel::Easy; 4];
    curve.extend(vec![DifficultyLabel::Medium; 8]);
    let out = sequence(&items, &SequencingRules::default(), Some(&curve)).expect("sequenced");
    let easy_front = out.items[..4].iter().filter(|i| i.difficulty_label == DifficultyLabel::Easy).count();
    assert!(easy_front >= 3, "{easy_front}");
  }

  #[test]
  fn too_many_traps_is_infeasible() {
    let items = mixed(6, 4);
    assert!(matches!(
      sequence(&items, &SequencingRules::default(), None),
      Err(ComposeError::QuotaInfeasible { bucket: BucketKey::TrapItems, .. })
    ));
  }

  proptest! {
    #[test]
    fn trap_slots_are_interior_and_spaced(n in 3usize..400, t in 0usize..60) {
      let t = t.min(max_trap_slots(n));
      let slots = trap_slots(n, t);
      prop_assert_eq!(slots.len(), t);
      for w in slots.windows(2) {
        prop_assert!(w[1] >= w[0] + 2);
      }
      if let (Some(first), Some(last)) = (slots.first(), slots.last()) {
        prop_assert!(*first > 0);
        prop_assert!(*last < n - 1);
      }
    }

    #[test]
    fn sequencing_is_deterministic_and_a_permutation(n in 10usize..40, traps in 0usize..3) {
      let items = mixed(n, traps);
      let a = sequence(&items, &SequencingRules::default(), None).expect("a");
      let b = sequence(&items, &SequencingRules::default(), None).expect("b");
      prop_assert_eq!(&a, &b);
      let mut ids: Vec<&str> = a.items.iter().map(|i| i.id.as_str()).collect();
      ids.sort();
      let mut want: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
      want.sort();
      prop_assert_eq!(ids, want);
    }
  }
}
