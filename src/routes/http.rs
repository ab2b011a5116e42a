//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Query, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{info, instrument};

use crate::bank::{ItemBank, ItemQuery};
use crate::domain::{ComposedTest, ItemDraft};
use crate::error::ComposeError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// Status for each failure: bad input is 400, unsatisfiable constraints 422.
fn error_response(e: &ComposeError) -> Response {
  let status = match e {
    ComposeError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
    ComposeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    _ => StatusCode::UNPROCESSABLE_ENTITY,
  };
  (status, Json(ErrorOut::from(e))).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let items = state.bank.read().await.len();
  Json(HealthOut { ok: true, items })
}

#[instrument(level = "info", skip(state), fields(subject = ?q.subject, topic = ?q.topic))]
pub async fn http_list_items(State(state): State<Arc<AppState>>, Query(q): Query<ItemQuery>) -> impl IntoResponse {
  let items = state.items(&q).await;
  info!(target: "examforge_backend", count = items.len(), "HTTP items listed");
  Json(ItemsOut { count: items.len(), items })
}

#[instrument(level = "info", skip(state, draft), fields(id = %draft.id, subject = %draft.subject))]
pub async fn http_add_item(State(state): State<Arc<AppState>>, Json(draft): Json<ItemDraft>) -> impl IntoResponse {
  let assessed = state.insert_draft(draft).await;
  (StatusCode::CREATED, Json(AssessmentOut::from(&assessed)))
}

#[instrument(level = "info", skip(state, body), fields(seed = ?body.seed))]
pub async fn http_compose(State(state): State<Arc<AppState>>, Json(body): Json<ComposeIn>) -> Response {
  match compose(&state, body.config, body.seed).await {
    Ok(test) => Json(test).into_response(),
    Err(e) => error_response(&e),
  }
}

#[instrument(level = "info", skip(state, body), fields(learner_id = %body.learner_id, seed = ?body.seed))]
pub async fn http_compose_adaptive(State(state): State<Arc<AppState>>, Json(body): Json<AdaptiveComposeIn>) -> Response {
  match compose_adaptive(&state, &body.learner_id, body.config, body.seed).await {
    Ok(test) => Json(test).into_response(),
    Err(e) => error_response(&e),
  }
}

#[instrument(level = "info", skip_all, fields(items = test.len()))]
pub async fn http_validate(Json(test): Json<ComposedTest>) -> impl IntoResponse {
  Json(revalidate(&test))
}

#[instrument(level = "info", skip(state, body), fields(learner_id = %body.learner_id, n = body.attempts.len()))]
pub async fn http_post_attempts(State(state): State<Arc<AppState>>, Json(body): Json<AttemptsIn>) -> impl IntoResponse {
  Json(submit_attempts(&state, &body.learner_id, body.attempts).await)
}

#[instrument(level = "info", skip(state), fields(learner_id = %q.learner_id))]
pub async fn http_get_profile(State(state): State<Arc<AppState>>, Query(q): Query<ProfileQuery>) -> impl IntoResponse {
  Json(state.profile(&q.learner_id).await)
}
