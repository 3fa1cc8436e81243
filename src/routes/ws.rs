//! WebSocket upgrade + assistant message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! The upgrade request must carry a session token (`/ws?token=...` from browsers).

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  http::HeaderMap,
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::{AppResult, AuthError};
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage, WsAuthQuery};
use crate::session::{bearer_token, SessionContext};
use crate::state::AppState;
use crate::assistant::{AssistantReply, GREETING};

/// Header token first, then `?token=`.
fn ws_token(headers: &HeaderMap, query: WsAuthQuery) -> Option<String> {
  bearer_token(headers).or_else(|| query.token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
}

#[instrument(level = "info", skip_all)]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(query): Query<WsAuthQuery>,
) -> AppResult<impl IntoResponse> {
  let token = ws_token(&headers, query).ok_or(AuthError::MissingToken)?;
  let ctx = state.session(&token).await?;
  info!(target: "skillstream", uid = %ctx.uid(), "WebSocket upgrade requested");
  Ok(ws.on_upgrade(move |socket| handle_ws(socket, state, ctx)))
}

#[instrument(level = "info", skip(socket, state, ctx), fields(uid = %ctx.uid()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, ctx: SessionContext) {
  info!(target: "skillstream", "WebSocket connected");
  let greeting = ServerWsMessage::AssistantReply { reply: AssistantReply::plain(GREETING) };
  if let Ok(out) = serde_json::to_string(&greeting) {
    if socket.send(Message::Text(out)).await.is_err() {
      return;
    }
  }
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "skillstream", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "skillstream", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "skillstream", uid = %ctx.uid(), "WebSocket disconnected");
}

fn to_ws(res: AppResult<AssistantReply>) -> ServerWsMessage {
  match res {
    Ok(reply) => ServerWsMessage::AssistantReply { reply },
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,
    ClientWsMessage::Chat { text } => to_ws(do_chat(state, &text).await),
    ClientWsMessage::Summarize { course_id, lecture_id } => to_ws(do_summarize(state, &course_id, &lecture_id).await),
    ClientWsMessage::Elaborate { previous } => to_ws(do_elaborate(state, &previous).await),
  }
}
