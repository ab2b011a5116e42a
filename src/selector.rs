//! Drawing the planned number of items per bucket from the gated pool.
//!
//! Flow:
//! 1) Deduplicate by id (first occurrence wins) and check every subject and
//!    difficulty bucket has enough items.
//! 2) Split the plan into subject × difficulty cell counts with a small
//!    max-flow: proportional initial flow, then BFS augmenting paths.
//! 3) Fill each cell by concept novelty; once nothing adds a new tag, pick
//!    at random from the seeded generator.
//! 4) Swap items inside cells until the trap count reaches its target.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, warn};

use crate::domain::{BucketKey, CandidateItem, CompositionConfig, CompositionPlan, DifficultyLabel, Subject};
use crate::error::{ComposeError, ComposeResult};
use crate::quota::trap_bounds;

/// Items drawn for one plan, in selection order.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
  pub items: Vec<CandidateItem>,
  pub cells: BTreeMap<(Subject, DifficultyLabel), usize>,
  pub trap_count: usize,
  pub covered_tags: usize,
}

struct FlowEdge {
  to: usize,
  capacity: usize,
  flow: usize,
  reverse: usize,
}

/// Integer flow network; edges come in forward/reverse pairs.
struct FlowNetwork {
  adjacency: Vec<Vec<usize>>,
  edges: Vec<FlowEdge>,
}

impl FlowNetwork {
  fn new(vertex_count: usize) -> Self {
    Self { adjacency: vec![Vec::new(); vertex_count], edges: Vec::new() }
  }

  fn add_edge(&mut self, from: usize, to: usize, capacity: usize, initial: usize) -> usize {
    let forward = self.edges.len();
    self.edges.push(FlowEdge { to, capacity, flow: initial, reverse: forward + 1 });
    self.edges.push(FlowEdge { to: from, capacity: 0, flow: 0, reverse: forward });
    self.adjacency[from].push(forward);
    self.adjacency[to].push(forward + 1);
    forward
  }

  fn residual(&self, e: usize) -> usize {
    let edge = &self.edges[e];
    if e % 2 == 0 {
      edge.capacity - edge.flow
    } else {
      self.edges[edge.reverse].flow
    }
  }

  fn push(&mut self, e: usize, amount: usize) {
    if e % 2 == 0 {
      self.edges[e].flow += amount;
    } else {
      let r = self.edges[e].reverse;
      self.edges[r].flow -= amount;
    }
  }

  /// Edmonds-Karp from the current flow; returns the flow added.
  fn augment(&mut self, source: usize, sink: usize) -> usize {
    let mut added = 0;
    loop {
      let mut via: Vec<Option<usize>> = vec![None; self.adjacency.len()];
      let mut queue = VecDeque::from([source]);
      let mut reached = false;
      while let Some(u) = queue.pop_front() {
        for &e in &self.adjacency[u] {
          let v = self.edges[e].to;
          if v != source && via[v].is_none() && self.residual(e) > 0 {
            via[v] = Some(e);
            if v == sink {
              reached = true;
              break;
            }
            queue.push_back(v);
          }
        }
        if reached {
          break;
        }
      }
      if !reached {
        return added;
      }
      let mut bottleneck = usize::MAX;
      let mut v = sink;
      while let Some(e) = via[v] {
        bottleneck = bottleneck.min(self.residual(e));
        v = self.edges[self.edges[e].reverse].to;
      }
      let mut v = sink;
      while let Some(e) = via[v] {
        self.push(e, bottleneck);
        v = self.edges[self.edges[e].reverse].to;
      }
      added += bottleneck;
    }
  }
}

/// Solve subject × difficulty cell counts.
fn cell_counts(
  plan: &CompositionPlan,
  available: &BTreeMap<(Subject, DifficultyLabel), usize>,
) -> ComposeResult<BTreeMap<(Subject, DifficultyLabel), usize>> {
  let n = plan.target_size;
  let subjects: Vec<(Subject, usize)> = plan.subject_counts.iter().map(|(s, c)| (*s, *c)).collect();
  let labels: Vec<(DifficultyLabel, usize)> = plan.difficulty_counts.iter().map(|(l, c)| (*l, *c)).collect();
  let source = 0;
  let sink = 1 + subjects.len() + labels.len();
  let mut net = FlowNetwork::new(sink + 1);

  let mut row = vec![0usize; subjects.len()];
  let mut col = vec![0usize; labels.len()];
  let mut cell_edges: Vec<(usize, usize, usize)> = vec![];
  for (si, (s, sc)) in subjects.iter().enumerate() {
    for (li, (l, lc)) in labels.iter().enumerate() {
      let avail = available.get(&(*s, *l)).copied().unwrap_or(0);
      let initial = if n == 0 { 0 } else { avail.min(sc * lc / n) };
      row[si] += initial;
      col[li] += initial;
      let e = net.add_edge(1 + si, 1 + subjects.len() + li, avail, initial);
      cell_edges.push((si, li, e));
    }
  }
  let mut subject_edges = vec![];
  for (si, (_, sc)) in subjects.iter().enumerate() {
    subject_edges.push(net.add_edge(source, 1 + si, *sc, row[si]));
  }
  for (li, (_, lc)) in labels.iter().enumerate() {
    net.add_edge(1 + subjects.len() + li, sink, *lc, col[li]);
  }

  let initial: usize = row.iter().sum();
  let total = initial + net.augment(source, sink);
  if total < n {
    for (si, e) in subject_edges.iter().enumerate() {
      let flowed = net.edges[*e].flow;
      if flowed < subjects[si].1 {
        return Err(ComposeError::InsufficientPool {
          bucket: BucketKey::Subject(subjects[si].0),
          required: subjects[si].1,
          available: flowed,
        });
      }
    }
  }

  Ok(cell_edges
    .into_iter()
    .map(|(si, li, e)| ((subjects[si].0, labels[li].0), net.edges[e].flow))
    .collect())
}

fn novelty(item: &CandidateItem, covered: &BTreeSet<&str>) -> usize {
  item.concept_tags.iter().filter(|t| !covered.contains(t.as_str())).count()
}

/// Draw `plan` from `pool` (already gated). `seed` drives every random choice.
#[instrument(level = "info", skip_all, fields(pool = pool.len(), target = plan.target_size, seed = seed))]
pub fn select(pool: &[&CandidateItem], plan: &CompositionPlan, config: &CompositionConfig, seed: u64) -> ComposeResult<Selection> {
  let mut ids: HashSet<&str> = HashSet::new();
  let unique: Vec<&CandidateItem> = pool.iter().copied().filter(|i| ids.insert(i.id.as_str())).collect();
  if unique.len() < pool.len() {
    debug!(target: "composer", dropped = pool.len() - unique.len(), "Dropped duplicate ids from pool");
  }

  for (s, want) in &plan.subject_counts {
    let have = unique.iter().filter(|i| i.subject == *s).count();
    if have < *want {
      return Err(ComposeError::InsufficientPool { bucket: BucketKey::Subject(*s), required: *want, available: have });
    }
  }
  for (l, want) in &plan.difficulty_counts {
    let have = unique.iter().filter(|i| i.difficulty_label == *l && plan.subject_counts.contains_key(&i.subject)).count();
    if have < *want {
      return Err(ComposeError::InsufficientPool { bucket: BucketKey::Difficulty(*l), required: *want, available: have });
    }
  }

  let mut candidates: BTreeMap<(Subject, DifficultyLabel), Vec<usize>> = BTreeMap::new();
  for (idx, item) in unique.iter().enumerate() {
    candidates.entry((item.subject, item.difficulty_label)).or_default().push(idx);
  }
  let available: BTreeMap<(Subject, DifficultyLabel), usize> = candidates.iter().map(|(k, v)| (*k, v.len())).collect();
  let cells = cell_counts(plan, &available)?;

  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut covered: BTreeSet<&str> = BTreeSet::new();
  let mut picked: BTreeMap<(Subject, DifficultyLabel), Vec<usize>> = BTreeMap::new();
  for (cell, want) in &cells {
    let mut open: Vec<usize> = candidates.get(cell).cloned().unwrap_or_default();
    let chosen = picked.entry(*cell).or_default();
    while chosen.len() < *want && !open.is_empty() {
      let best = open
        .iter()
        .enumerate()
        .map(|(pos, &idx)| (pos, novelty(unique[idx], &covered), unique[idx].quality_score))
        .fold(None, |acc: Option<(usize, usize, f64)>, cur| match acc {
          Some(a) if a.1 > cur.1 || (a.1 == cur.1 && a.2 >= cur.2) => Some(a),
          _ => Some(cur),
        });
      let pos = match best {
        Some((pos, gain, _)) if gain > 0 => pos,
        _ => rng.gen_range(0..open.len()),
      };
      let idx = open.remove(pos);
      covered.extend(unique[idx].concept_tags.iter().map(String::as_str));
      chosen.push(idx);
    }
  }

  let (lo, hi) = trap_bounds(plan.target_size, &config.trap_ratio_range);
  let mut traps: usize = picked.values().flatten().filter(|&&i| unique[i].is_trap).count();
  let target = plan.trap_target;
  let mut progressed = true;
  while traps != target && progressed {
    progressed = false;
    let want_trap = traps < target;
    for (cell, chosen) in picked.iter_mut() {
      if traps == target {
        break;
      }
      let pool_cell = candidates.get(cell).map(Vec::as_slice).unwrap_or(&[]);
      let out_pos = chosen.iter().rposition(|&i| unique[i].is_trap != want_trap);
      let incoming = pool_cell.iter().copied().find(|i| unique[*i].is_trap == want_trap && !chosen.contains(i));
      if let (Some(out_pos), Some(incoming)) = (out_pos, incoming) {
        chosen[out_pos] = incoming;
        traps = if want_trap { traps + 1 } else { traps - 1 };
        progressed = true;
      }
    }
  }
  if traps < lo || traps > hi {
    if !config.best_effort {
      return Err(ComposeError::InsufficientPool {
        bucket: BucketKey::TrapItems,
        required: target,
        available: traps,
      });
    }
    warn!(target: "composer", traps, lo, hi, "Trap count outside range; continuing in best-effort mode");
  }

  let items: Vec<CandidateItem> = picked.values().flatten().map(|&i| unique[i].clone()).collect();
  let covered_tags = items.iter().flat_map(|i| i.concept_tags.iter()).collect::<BTreeSet<_>>().len();
  debug!(target: "composer", items = items.len(), traps, covered_tags, "Selection complete");
  Ok(Selection { items, cells, trap_count: traps, covered_tags })
}
