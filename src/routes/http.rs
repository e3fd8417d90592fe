//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs the session and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::creative::ChallengeDuration;
use crate::domain::{AnswerOutcome, GameKind};
use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::session::DEFAULT_SESSION;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

/// Session id from `x-session-id`, or the shared default session.
pub fn session_id(headers: &HeaderMap) -> String {
  headers
    .get(SESSION_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .unwrap_or(DEFAULT_SESSION)
    .to_string()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let llm = state.capability_description();
  Json(HealthOut {
    status: "ok",
    components: ComponentsOut {
      quiz: true,
      riddle: true,
      fun_facts: state.fun_facts.is_available(),
      creative_writing: true,
      llm,
    },
  })
}

// --- Quiz ---

#[instrument(level = "info", skip(state, headers))]
pub async fn http_quiz_question(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let session = session_id(&headers);
  match new_quiz_question(&state, &session).await {
    Ok(q) => {
      info!(target: "game", %session, complexity = q.complexity, "HTTP quiz question served");
      Json(q).into_response()
    }
    Err(placeholder) => (StatusCode::BAD_GATEWAY, Json(placeholder)).into_response(),
  }
}

#[instrument(level = "info", skip(state, headers, body), fields(answer_len = body.answer.len()))]
pub async fn http_quiz_answer(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<QuizAnswerIn>,
) -> Result<Json<AnswerOut>, ApiError> {
  let session = session_id(&headers);
  let outcome = submit_answer(&state, GameKind::Quiz, &session, &body.answer).await;
  if outcome == AnswerOutcome::NoActiveChallenge {
    return Err(ApiError::BadRequest("No active question. Please get a new question first.".into()));
  }
  info!(target: "game", %session, correct = outcome.is_correct(), "HTTP quiz answer checked");
  Ok(Json(answer_out(&outcome)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_break(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (_, options) = break_options(&state, GameKind::Quiz).await;
  Json(QuizBreakOut { options })
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_quiz_reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
  Json(reset_game(&state, GameKind::Quiz, &session_id(&headers)).await)
}

// --- Riddle ---

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_riddle(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let session = session_id(&headers);
  match new_riddle(&state, &session).await {
    Ok(r) => {
      info!(target: "game", %session, complexity = r.complexity, "HTTP riddle served");
      Json(r).into_response()
    }
    Err(placeholder) => (StatusCode::BAD_GATEWAY, Json(placeholder)).into_response(),
  }
}

#[instrument(level = "info", skip(state, headers, body), fields(answer_len = body.user_answer.len()))]
pub async fn http_riddle_check_answer(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<RiddleAnswerIn>,
) -> impl IntoResponse {
  let session = session_id(&headers);
  let outcome = submit_answer(&state, GameKind::Riddle, &session, &body.user_answer).await;
  info!(target: "game", %session, correct = outcome.is_correct(), "HTTP riddle answer checked");
  Json(answer_out(&outcome))
}

#[instrument(level = "info", skip(state))]
pub async fn http_riddle_break_options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (break_options, _) = break_options(&state, GameKind::Riddle).await;
  Json(RiddleBreakOut { break_options })
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_riddle_reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
  Json(reset_game(&state, GameKind::Riddle, &session_id(&headers)).await)
}

// --- Fun facts ---

#[instrument(level = "info", skip(state))]
pub async fn http_fun_fact(
  State(state): State<Arc<AppState>>,
  Query(q): Query<FunFactQuery>,
) -> Result<Json<FunFactOut>, ApiError> {
  Ok(Json(fun_fact(&state, q.topic.as_deref()).await?))
}

// --- Creative writing ---

#[instrument(level = "info", skip(state))]
pub async fn http_create_prompt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChallengeDuration>,
) -> Result<Json<CreateChallengeOut>, ApiError> {
  let challenge = state.creative.create(body).await?;
  Ok(Json(challenge.into()))
}

#[instrument(level = "info", skip(state, body), fields(%id, submission_len = body.submission.len()))]
pub async fn http_evaluate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EvaluateIn>,
) -> Result<Json<EvaluateOut>, ApiError> {
  let evaluation = state.creative.evaluate(id, &body.submission).await?;
  Ok(Json(EvaluateOut { message: "Submission evaluated successfully".into(), evaluation }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_scores(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.creative.scores(id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_challenge_status(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ChallengeStatusOut>, ApiError> {
  Ok(Json(state.creative.status(id).await?.into()))
}
