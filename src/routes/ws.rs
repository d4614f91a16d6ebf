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
use chrono::Utc;
use tracing::{debug, error, info, instrument};

use crate::logic::{fetch_progress, record_result, register_user};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "prepdeck_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "prepdeck_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "prepdeck_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "prepdeck_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "prepdeck_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::RegisterUser { user_id } => {
      let (user_id, progress, created) = register_user(state, user_id).await;
      tracing::info!(target: "progress", %user_id, created, "WS register_user handled");
      ServerWsMessage::Registered { user_id, progress, created }
    }

    ClientWsMessage::GetProgress { user_id } => match fetch_progress(state, &user_id).await {
      Ok(progress) => ServerWsMessage::Progress { user_id, progress },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::SubmitResult { user_id, assessment_id, score, total } => {
      let now = Utc::now();
      match record_result(state, &user_id, score, total, now).await {
        Ok((progress, summary)) => {
          tracing::info!(
            target: "progress",
            %user_id,
            assessment_id = assessment_id.as_deref().unwrap_or("-"),
            xp_gained = summary.xp_gained,
            leveled_up = summary.leveled_up,
            "WS result recorded"
          );
          ServerWsMessage::ResultRecorded { user_id, progress, summary }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
  }
}
