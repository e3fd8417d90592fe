//! Domain models used by the backend: game kinds, the active challenge record,
//! and the outcome of an answer check.

use serde::{Deserialize, Serialize};

/// Which game a state machine runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
  Quiz,
  Riddle,
}

impl GameKind {
  pub fn as_str(self) -> &'static str {
    match self {
      GameKind::Quiz => "quiz",
      GameKind::Riddle => "riddle",
    }
  }
}

/// The one active question/riddle of a game instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChallengeRecord {
  pub content: String,
  /// Raw option lines (`A) ...`); empty for riddles.
  pub options: Vec<String>,
  pub hint: String,
  /// As emitted by the model: full text or an option letter.
  pub correct_answer: String,
}

/// Lifecycle of a state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
  Empty,
  Active,
  /// The attempt budget ran out and the answer was revealed.
  Exhausted,
}

/// Result of one `check_answer` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
  NoActiveChallenge,
  Correct { complexity: u8 },
  Incorrect { remaining: u8, hint: String },
  /// A numeral that does not select any option. Still counts as an attempt.
  InvalidOption { remaining: u8, hint: String },
  Revealed { answer: String, hint: String },
}

impl AnswerOutcome {
  pub fn is_correct(&self) -> bool {
    matches!(self, AnswerOutcome::Correct { .. })
  }

  pub fn message(&self) -> String {
    match self {
      AnswerOutcome::NoActiveChallenge => "No active question".into(),
      AnswerOutcome::Correct { .. } => "Correct! Moving to next level.".into(),
      AnswerOutcome::Incorrect { remaining, .. } => format!("Wrong! {} attempts remaining", remaining),
      AnswerOutcome::InvalidOption { .. } => "Invalid option number".into(),
      AnswerOutcome::Revealed { answer, .. } => {
        format!("No worries! The answer is {}. Want to try another one or need a break?", answer)
      }
    }
  }

  /// Attempts left in the current cycle, where that is meaningful.
  pub fn attempts_remaining(&self) -> Option<u8> {
    match self {
      AnswerOutcome::NoActiveChallenge | AnswerOutcome::Revealed { .. } => Some(0),
      AnswerOutcome::Correct { .. } => None,
      AnswerOutcome::Incorrect { remaining, .. } | AnswerOutcome::InvalidOption { remaining, .. } => Some(*remaining),
    }
  }

  pub fn hint(&self) -> Option<&str> {
    match self {
      AnswerOutcome::Incorrect { hint, .. }
      | AnswerOutcome::InvalidOption { hint, .. }
      | AnswerOutcome::Revealed { hint, .. } => Some(hint),
      _ => None,
    }
  }

  pub fn complexity(&self) -> Option<u8> {
    match self {
      AnswerOutcome::Correct { complexity } => Some(*complexity),
      _ => None,
    }
  }
}
