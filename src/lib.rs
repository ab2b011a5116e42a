//! ExamForge · exam composition engine
//!
//! Turns a bank of question drafts into complete tests that meet subject
//! quotas, a difficulty ratio, trap-item limits and spacing rules, with an
//! audit report attached. The same pipeline, biased by a learner's attempt
//! history, builds adaptive tests.
//!
//! Pipeline: `assess` (score + gate) → `quota` → `selector` → `sequencer`
//! → `validation`, wired together in `compose`. The axum service in
//! `routes` exposes it over HTTP and WebSocket.

pub mod telemetry;
pub mod util;
pub mod domain;
pub mod error;
pub mod config;
pub mod difficulty;
pub mod quality;
pub mod assess;
pub mod quota;
pub mod selector;
pub mod sequencer;
pub mod profile;
pub mod validation;
pub mod compose;
pub mod bank;
pub mod seeds;
pub mod state;
pub mod protocol;
pub mod logic;
pub mod routes;

pub use assess::prepare_pool;
pub use compose::{compose_adaptive_test, compose_test};
pub use config::{EngineConfig, EngineSettings};
pub use domain::{AttemptRecord, CandidateItem, ComposedTest, CompositionConfig, ItemDraft};
pub use error::{ComposeError, ComposeResult};
pub use profile::{AdaptiveThresholds, LearnerProfile};
pub use validation::{validate, ValidationReport};
