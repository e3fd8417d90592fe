//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//! Every connection plays in its own session, dropped on disconnect.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "questbot_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let session = format!("ws-{}", Uuid::new_v4());
  info!(target: "questbot_backend", %session, "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "questbot_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &session).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "questbot_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  state.sessions.drop_session(&session).await;
  info!(target: "questbot_backend", %session, "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &str) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewQuestion => match new_quiz_question(state, session).await {
      Ok(question) => ServerWsMessage::Question { question },
      Err(placeholder) => ServerWsMessage::Error {
        message: placeholder.error.unwrap_or(placeholder.question),
      },
    },

    ClientWsMessage::NewRiddle => match new_riddle(state, session).await {
      Ok(riddle) => ServerWsMessage::Riddle { riddle },
      Err(placeholder) => ServerWsMessage::Error {
        message: placeholder.error.unwrap_or(placeholder.riddle),
      },
    },

    ClientWsMessage::SubmitAnswer { game, answer } => {
      let outcome = submit_answer(state, game, session, &answer).await;
      info!(target: "game", game = game.as_str(), correct = outcome.is_correct(), "WS submit_answer evaluated");
      ServerWsMessage::AnswerResult { game, result: answer_out(&outcome) }
    }

    ClientWsMessage::BreakOptions { game } => {
      let (text, options) = break_options(state, game).await;
      ServerWsMessage::BreakOptions { game, text, options }
    }

    ClientWsMessage::Reset { game } => {
      let out = reset_game(state, game, session).await;
      ServerWsMessage::Reset { game, message: out.message }
    }

    ClientWsMessage::FunFact { topic } => match fun_fact(state, topic.as_deref()).await {
      Ok(f) => ServerWsMessage::FunFact { topic: f.topic, facts: f.facts },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },
  }
}
