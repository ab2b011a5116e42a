//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::*;
use crate::protocol::{AssessmentOut, ClientWsMessage, ErrorOut, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "examforge_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "examforge_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "examforge_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "examforge_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => {
        let _ = socket.send(Message::Pong(payload)).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "examforge_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Compose { config, seed } => match compose(state, config, seed).await {
      Ok(test) => ServerWsMessage::Test { test: Box::new(test) },
      Err(e) => ServerWsMessage::ComposeFailed { error: ErrorOut::from(&e) },
    },

    ClientWsMessage::ComposeAdaptive { learner_id, config, seed } => {
      match compose_adaptive(state, &learner_id, config, seed).await {
        Ok(test) => ServerWsMessage::Test { test: Box::new(test) },
        Err(e) => ServerWsMessage::ComposeFailed { error: ErrorOut::from(&e) },
      }
    }

    ClientWsMessage::Validate { test } => ServerWsMessage::Report { report: revalidate(&test) },

    ClientWsMessage::ListItems { query } => ServerWsMessage::Items { items: state.items(&query).await },

    ClientWsMessage::AddItem { item } => {
      let assessed = state.insert_draft(*item).await;
      ServerWsMessage::Assessment { assessment: AssessmentOut::from(&assessed) }
    }

    ClientWsMessage::SubmitAttempts { learner_id, attempts } => {
      ServerWsMessage::Attempts { out: submit_attempts(state, &learner_id, attempts).await }
    }

    ClientWsMessage::Profile { learner_id } => ServerWsMessage::Profile { profile: state.profile(&learner_id).await },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::EngineConfig;

  #[tokio::test]
  async fn ws_dispatch_answers_each_message_kind() {
    let state = AppState::from_config(EngineConfig::default()).expect("state");

    let reply = handle_client_ws(ClientWsMessage::Ping, &state).await;
    assert!(matches!(reply, ServerWsMessage::Pong));

    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"compose","seed":5}"#).expect("parse");
    let test = match handle_client_ws(msg, &state).await {
      ServerWsMessage::Test { test } => test,
      other => panic!("unexpected {other:?}"),
    };
    assert!(test.report.valid);

    let reply = handle_client_ws(ClientWsMessage::Validate { test }, &state).await;
    assert!(matches!(reply, ServerWsMessage::Report { report } if report.valid));

    let config = crate::domain::CompositionConfig { target_size: 210, ..Default::default() };
    match handle_client_ws(ClientWsMessage::Compose { config: Some(config), seed: Some(1) }, &state).await {
      ServerWsMessage::ComposeFailed { error } => assert_eq!(error.code, "quota_infeasible"),
      other => panic!("unexpected {other:?}"),
    }
  }
}
