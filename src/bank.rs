//! Collaborators the service composes against: the question bank and the
//! learner attempt log. Both are plain in-memory stores here; the service
//! wraps them in `tokio::sync::RwLock`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AttemptRecord, CandidateItem, Subject};

/// Filter for bank listings. Empty fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemQuery {
  #[serde(default)] pub subject: Option<Subject>,
  /// Case-insensitive exact topic match.
  #[serde(default)] pub topic: Option<String>,
}

impl ItemQuery {
  pub fn matches(&self, item: &CandidateItem) -> bool {
    if self.subject.is_some_and(|s| s != item.subject) {
      return false;
    }
    match &self.topic {
      Some(t) => item.topic.eq_ignore_ascii_case(t.trim()),
      None => true,
    }
  }
}

pub trait ItemBank: Send + Sync {
  /// Items matching `query`, in insertion order.
  fn items(&self, query: &ItemQuery) -> Vec<CandidateItem>;
  fn get(&self, id: &str) -> Option<CandidateItem>;
  /// Insert or replace by id. Returns true when the id was new.
  fn upsert(&mut self, item: CandidateItem) -> bool;
  fn len(&self) -> usize;
  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Append-only record of what each learner answered.
pub trait AttemptLog: Send + Sync {
  fn append(&mut self, learner_id: &str, records: Vec<AttemptRecord>) -> usize;
  fn history(&self, learner_id: &str) -> Vec<AttemptRecord>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryBank {
  by_id: HashMap<String, CandidateItem>,
  order: Vec<String>,
}

impl InMemoryBank {
  pub fn new() -> Self {
    Self::default()
  }
}

impl FromIterator<CandidateItem> for InMemoryBank {
  fn from_iter<I: IntoIterator<Item = CandidateItem>>(iter: I) -> Self {
    let mut bank = Self::new();
    for item in iter {
      bank.upsert(item);
    }
    bank
  }
}

impl ItemBank for InMemoryBank {
  fn items(&self, query: &ItemQuery) -> Vec<CandidateItem> {
    self.order.iter().filter_map(|id| self.by_id.get(id)).filter(|i| query.matches(i)).cloned().collect()
  }

  fn get(&self, id: &str) -> Option<CandidateItem> {
    self.by_id.get(id).cloned()
  }

  fn upsert(&mut self, item: CandidateItem) -> bool {
    let id = item.id.clone();
    let fresh = self.by_id.insert(id.clone(), item).is_none();
    if fresh {
      self.order.push(id);
    }
    fresh
  }

  fn len(&self) -> usize {
    self.order.len()
  }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryAttemptLog {
  by_learner: HashMap<String, Vec<AttemptRecord>>,
}

impl AttemptLog for InMemoryAttemptLog {
  /// Returns the learner's total after appending.
  fn append(&mut self, learner_id: &str, records: Vec<AttemptRecord>) -> usize {
    let log = self.by_learner.entry(learner_id.to_string()).or_default();
    log.extend(records);
    log.len()
  }

  fn history(&self, learner_id: &str) -> Vec<AttemptRecord> {
    self.by_learner.get(learner_id).cloned().unwrap_or_default()
  }
}
