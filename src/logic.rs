//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating quiz questions and riddles for a session
//!   - Checking answers and shaping the outcome
//!   - Break suggestions, game resets and fun facts

use tracing::{info, instrument};

use crate::domain::{AnswerOutcome, GameKind};
use crate::error::{FunFactError, GenerateError};
use crate::game::GeneratedChallenge;
use crate::protocol::{AnswerOut, FunFactOut, QuizQuestionOut, ResetOut, RiddleOut};
use crate::state::AppState;
use crate::util::non_empty_lines;

/// Present a generated quiz the way clients expect it.
pub fn quiz_out(c: &GeneratedChallenge) -> QuizQuestionOut {
  QuizQuestionOut {
    question: format!("Question (Complexity Level {}): {}", c.complexity, c.content),
    options: c.options.clone(),
    hint: format!("Hint: {}", c.hint),
    complexity: c.complexity,
    attempts_remaining: c.attempts_remaining,
    error: None,
  }
}

fn quiz_placeholder(e: &GenerateError) -> QuizQuestionOut {
  QuizQuestionOut {
    question: e.placeholder_content.clone(),
    options: Vec::new(),
    hint: e.placeholder_hint.clone(),
    complexity: e.complexity,
    attempts_remaining: e.attempts_remaining,
    error: Some(e.to_string()),
  }
}

pub fn riddle_out(c: &GeneratedChallenge) -> RiddleOut {
  RiddleOut {
    riddle: c.content.clone(),
    hint: c.hint.clone(),
    complexity: c.complexity,
    attempts_remaining: c.attempts_remaining,
    error: None,
  }
}

fn riddle_placeholder(e: &GenerateError) -> RiddleOut {
  RiddleOut {
    riddle: e.placeholder_content.clone(),
    hint: e.placeholder_hint.clone(),
    complexity: e.complexity,
    attempts_remaining: e.attempts_remaining,
    error: Some(e.to_string()),
  }
}

/// New quiz question for `session`. `Err` carries a displayable placeholder.
#[instrument(level = "info", skip(state))]
pub async fn new_quiz_question(state: &AppState, session: &str) -> Result<QuizQuestionOut, QuizQuestionOut> {
  let machine = state.sessions.machine(GameKind::Quiz, session).await;
  let mut machine = machine.lock().await;
  match machine.generate_challenge(None).await {
    Ok(c) => Ok(quiz_out(&c)),
    Err(e) => Err(quiz_placeholder(&e)),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn new_riddle(state: &AppState, session: &str) -> Result<RiddleOut, RiddleOut> {
  let machine = state.sessions.machine(GameKind::Riddle, session).await;
  let mut machine = machine.lock().await;
  match machine.generate_challenge(None).await {
    Ok(c) => Ok(riddle_out(&c)),
    Err(e) => Err(riddle_placeholder(&e)),
  }
}

#[instrument(level = "info", skip(state, answer), fields(game = game.as_str(), answer_len = answer.len()))]
pub async fn submit_answer(state: &AppState, game: GameKind, session: &str, answer: &str) -> AnswerOutcome {
  let Some(machine) = state.sessions.existing(game, session).await else {
    return AnswerOutcome::NoActiveChallenge;
  };
  let mut machine = machine.lock().await;
  machine.check_answer(answer).await
}

pub fn answer_out(outcome: &AnswerOutcome) -> AnswerOut {
  AnswerOut::from(outcome)
}

/// Raw suggestion text and its non-empty lines.
#[instrument(level = "info", skip(state), fields(game = game.as_str()))]
pub async fn break_options(state: &AppState, game: GameKind) -> (String, Vec<String>) {
  let text = state.breaks.suggest(game).await;
  let lines = non_empty_lines(&text);
  (text, lines)
}

#[instrument(level = "info", skip(state), fields(game = game.as_str()))]
pub async fn reset_game(state: &AppState, game: GameKind, session: &str) -> ResetOut {
  // Nothing to reset for a session that never generated a challenge.
  if let Some(machine) = state.sessions.existing(game, session).await {
    machine.lock().await.reset();
  }
  info!(target: "game", game = game.as_str(), %session, "Reset requested");
  ResetOut { message: "Game reset successfully".into(), status: true }
}

#[instrument(level = "info", skip(state))]
pub async fn fun_fact(state: &AppState, topic: Option<&str>) -> Result<FunFactOut, FunFactError> {
  let fact = state.fun_facts.generate(topic).await?;
  Ok(FunFactOut { success: true, topic: fact.topic, facts: fact.facts })
}
