//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::creative::{ChallengeDuration, ChallengeStatus, TimeUnit, WritingChallenge, WritingScores};
use crate::domain::{AnswerOutcome, GameKind};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewQuestion,
    NewRiddle,
    SubmitAnswer {
        game: GameKind,
        answer: String,
    },
    BreakOptions {
        game: GameKind,
    },
    Reset {
        game: GameKind,
    },
    FunFact {
        #[serde(default)]
        topic: Option<String>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Question {
        #[serde(flatten)]
        question: QuizQuestionOut,
    },
    Riddle {
        #[serde(flatten)]
        riddle: RiddleOut,
    },
    AnswerResult {
        game: GameKind,
        #[serde(flatten)]
        result: AnswerOut,
    },
    BreakOptions {
        game: GameKind,
        text: String,
        options: Vec<String>,
    },
    Reset {
        game: GameKind,
        message: String,
    },
    FunFact {
        topic: String,
        facts: String,
    },
    Error {
        message: String,
    },
}

//
// Quiz & riddle
//

#[derive(Debug, Serialize)]
pub struct QuizQuestionOut {
    pub question: String,
    pub options: Vec<String>,
    pub hint: String,
    pub complexity: u8,
    pub attempts_remaining: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RiddleOut {
    pub riddle: String,
    pub hint: String,
    pub complexity: u8,
    pub attempts_remaining: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct QuizAnswerIn {
    pub answer: String,
}

#[derive(Deserialize)]
pub struct RiddleAnswerIn {
    pub user_answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u8>,
}

impl From<&AnswerOutcome> for AnswerOut {
    fn from(o: &AnswerOutcome) -> Self {
        AnswerOut {
            correct: o.is_correct(),
            message: o.message(),
            attempts_remaining: o.attempts_remaining(),
            hint: o.hint().map(str::to_string),
            complexity: o.complexity(),
        }
    }
}

#[derive(Serialize)]
pub struct QuizBreakOut {
    pub options: Vec<String>,
}

#[derive(Serialize)]
pub struct RiddleBreakOut {
    pub break_options: String,
}

#[derive(Debug, Serialize)]
pub struct ResetOut {
    pub message: String,
    pub status: bool,
}

//
// Fun facts
//

#[derive(Debug, Deserialize)]
pub struct FunFactQuery {
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FunFactOut {
    pub success: bool,
    pub topic: String,
    pub facts: String,
}

//
// Creative writing
//

#[derive(Debug, Serialize)]
pub struct DurationOut {
    pub value: u32,
    pub unit: TimeUnit,
}

impl From<ChallengeDuration> for DurationOut {
    fn from(d: ChallengeDuration) -> Self {
        DurationOut { value: d.duration, unit: d.time_unit }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChallengeOut {
    pub id: Uuid,
    pub prompt: String,
    pub criteria: String,
    pub end_time: DateTime<Utc>,
    pub status: ChallengeStatus,
    pub duration: DurationOut,
}

impl From<WritingChallenge> for CreateChallengeOut {
    fn from(c: WritingChallenge) -> Self {
        CreateChallengeOut {
            id: c.id,
            prompt: c.prompt,
            criteria: c.criteria,
            end_time: c.end_time,
            status: c.status,
            duration: c.duration.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct EvaluateIn {
    pub submission: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluateOut {
    pub message: String,
    pub evaluation: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeStatusOut {
    pub id: Uuid,
    pub status: ChallengeStatus,
    pub end_time: DateTime<Utc>,
    pub prompt: String,
    pub criteria: String,
    pub evaluation: Option<String>,
    pub scores: Option<WritingScores>,
}

impl From<WritingChallenge> for ChallengeStatusOut {
    fn from(c: WritingChallenge) -> Self {
        let completed = c.status == ChallengeStatus::Completed;
        ChallengeStatusOut {
            id: c.id,
            status: c.status,
            end_time: c.end_time,
            prompt: c.prompt,
            criteria: c.criteria,
            evaluation: c.evaluation.filter(|_| completed),
            scores: c.scores.filter(|_| completed),
        }
    }
}

//
// Health
//

#[derive(Debug, Serialize)]
pub struct ComponentsOut {
    pub quiz: bool,
    pub riddle: bool,
    pub fun_facts: bool,
    pub creative_writing: bool,
    pub llm: String,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub components: ComponentsOut,
}
