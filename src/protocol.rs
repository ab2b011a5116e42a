//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::assess::AssessedItem;
use crate::bank::ItemQuery;
use crate::domain::{AttemptRecord, CandidateItem, ComposedTest, CompositionConfig, DifficultyLabel, ItemDraft};
use crate::error::ComposeError;
use crate::profile::LearnerProfile;
use crate::quality::Finding;
use crate::validation::{ValidationReport, Violation};

/// Shown to users whenever composition fails; the structured error follows.
pub const COMPOSE_FAILED: &str = "test could not be generated with the given constraints";

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  Compose {
    #[serde(default)]
    config: Option<CompositionConfig>,
    #[serde(default)]
    seed: Option<u64>,
  },
  ComposeAdaptive {
    #[serde(rename = "learnerId")]
    learner_id: String,
    #[serde(default)]
    config: Option<CompositionConfig>,
    #[serde(default)]
    seed: Option<u64>,
  },
  Validate {
    test: Box<ComposedTest>,
  },
  ListItems {
    #[serde(flatten)]
    query: ItemQuery,
  },
  AddItem {
    item: Box<ItemDraft>,
  },
  SubmitAttempts {
    #[serde(rename = "learnerId")]
    learner_id: String,
    attempts: Vec<AttemptRecord>,
  },
  Profile {
    #[serde(rename = "learnerId")]
    learner_id: String,
  },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  Test {
    test: Box<ComposedTest>,
  },
  ComposeFailed {
    error: ErrorOut,
  },
  Report {
    report: ValidationReport,
  },
  Items {
    items: Vec<CandidateItem>,
  },
  Assessment {
    assessment: AssessmentOut,
  },
  Attempts {
    #[serde(flatten)]
    out: AttemptsOut,
  },
  Profile {
    profile: LearnerProfile,
  },
  Error {
    message: String,
  },
}

/// Error body shared by HTTP and WS.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
  pub message: String,
  pub code: &'static str,
  pub detail: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub violations: Vec<Violation>,
}

impl From<&ComposeError> for ErrorOut {
  fn from(e: &ComposeError) -> Self {
    let violations = match e {
      ComposeError::ValidationFailed { violations } => violations.clone(),
      _ => vec![],
    };
    Self { message: COMPOSE_FAILED.to_string(), code: e.code(), detail: e.to_string(), violations }
  }
}

/// Gate and scorer outcome for one stored item.
#[derive(Debug, Serialize)]
pub struct AssessmentOut {
  pub id: String,
  pub passed: bool,
  pub quality_score: f64,
  pub raw_difficulty_score: f64,
  pub difficulty_label: DifficultyLabel,
  pub is_trap: bool,
  pub findings: Vec<Finding>,
}

impl From<&AssessedItem> for AssessmentOut {
  fn from(a: &AssessedItem) -> Self {
    Self {
      id: a.item.id.clone(),
      passed: a.verdict.passed,
      quality_score: a.verdict.quality_score,
      raw_difficulty_score: a.item.raw_difficulty_score,
      difficulty_label: a.item.difficulty_label,
      is_trap: a.item.is_trap,
      findings: a.verdict.findings.clone(),
    }
  }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct ComposeIn {
  #[serde(default)]
  pub config: Option<CompositionConfig>,
  #[serde(default)]
  pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AdaptiveComposeIn {
  #[serde(rename = "learnerId")]
  pub learner_id: String,
  #[serde(default)]
  pub config: Option<CompositionConfig>,
  #[serde(default)]
  pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ItemsOut {
  pub count: usize,
  pub items: Vec<CandidateItem>,
}

#[derive(Debug, Deserialize)]
pub struct AttemptsIn {
  #[serde(rename = "learnerId")]
  pub learner_id: String,
  pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Serialize)]
pub struct AttemptsOut {
  #[serde(rename = "learnerId")]
  pub learner_id: String,
  pub recorded: usize,
  pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
  #[serde(rename = "learnerId")]
  pub learner_id: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub items: usize,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{BucketKey, Subject};

  #[test]
  fn client_messages_parse_from_tagged_json() {
    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"compose","seed":7}"#).expect("compose");
    assert!(matches!(m, ClientWsMessage::Compose { config: None, seed: Some(7) }));

    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"list_items","subject":"history"}"#).expect("list");
    match m {
      ClientWsMessage::ListItems { query } => assert_eq!(query.subject, Some(Subject::History)),
      other => panic!("unexpected {other:?}"),
    }

    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"profile","learnerId":"ana"}"#).expect("profile");
    assert!(matches!(m, ClientWsMessage::Profile { learner_id } if learner_id == "ana"));
  }

  #[test]
  fn compose_errors_carry_the_user_message_and_code() {
    let e = ComposeError::QuotaInfeasible { bucket: BucketKey::TrapItems, reason: "too few slots".into() };
    let out = ErrorOut::from(&e);
    let v = serde_json::to_value(ServerWsMessage::ComposeFailed { error: out }).expect("json");
    assert_eq!(v["type"], "compose_failed");
    assert_eq!(v["error"]["message"], COMPOSE_FAILED);
    assert_eq!(v["error"]["code"], "quota_infeasible");
    assert!(v["error"].get("violations").is_none());
  }
}
