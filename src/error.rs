//! Error taxonomy for the capability boundary, reply parsing and the game surface.
//!
//! Capability errors are recovered locally wherever a fallback exists (verifier,
//! break suggestions, writing prompts). Parse and generation errors are surfaced
//! to the caller; `ApiError` is the HTTP projection of all of them.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extract::Section;
use crate::util::trunc_for_log;

/// A call to the text-generation capability did not produce usable text.
#[derive(Debug, Error)]
pub enum CapabilityError {
  /// No client was configured (no API key) or it failed to build at startup.
  #[error("text generation capability unavailable")]
  Unavailable,

  /// Transport-level failure, including timeouts.
  #[error("transport error: {0}")]
  Http(String),

  /// The backend answered with a non-success status.
  #[error("backend HTTP {status}: {message}")]
  Api { status: u16, message: String },

  /// The backend answered but the reply carried no text.
  #[error("empty reply from backend")]
  EmptyReply,

  /// The reply body (or a JSON-mode payload) could not be decoded.
  #[error("could not decode reply: {0}")]
  Decode(String),
}

impl CapabilityError {
  pub fn is_unavailable(&self) -> bool {
    matches!(self, CapabilityError::Unavailable)
  }
}

impl From<reqwest::Error> for CapabilityError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      CapabilityError::Decode(e.to_string())
    } else {
      CapabilityError::Http(e.to_string())
    }
  }
}

/// A reply could not be decomposed into its required sections.
/// Carries the raw reply for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("could not extract {missing:?} from model reply ({})", trunc_for_log(.raw, 80))]
pub struct ParseFailure {
  pub raw: String,
  pub missing: Vec<Section>,
}

/// Why a question/riddle could not be generated.
#[derive(Debug, Error)]
pub enum GenerateFailure {
  #[error(transparent)]
  Capability(#[from] CapabilityError),
  #[error(transparent)]
  Parse(#[from] ParseFailure),
}

/// Typed generation failure with a displayable placeholder so callers always
/// have something to show.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct GenerateError {
  #[source]
  pub source: GenerateFailure,
  pub placeholder_content: String,
  pub placeholder_hint: String,
  pub complexity: u8,
  pub attempts_remaining: u8,
}

#[derive(Debug, Error)]
pub enum FunFactError {
  #[error("fun facts unavailable: {0}")]
  Capability(#[from] CapabilityError),
}

#[derive(Debug, Error)]
pub enum CreativeError {
  #[error("Challenge not found")]
  NotFound,
  #[error("Challenge is not active")]
  NotActive,
  #[error("Challenge has expired")]
  Expired,
  #[error("Challenge evaluation not completed")]
  NotCompleted,
  #[error("Scores not found")]
  ScoresMissing,
  #[error("{0}")]
  InvalidDuration(String),
  #[error("Submission is empty")]
  EmptySubmission,
  #[error("Failed to evaluate submission: {0}")]
  Evaluation(#[from] CapabilityError),
}

/// Error shape returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Unprocessable(String),
  #[error("{0}")]
  Upstream(String),
}

impl From<CreativeError> for ApiError {
  fn from(e: CreativeError) -> Self {
    match e {
      CreativeError::NotFound | CreativeError::ScoresMissing => ApiError::NotFound(e.to_string()),
      CreativeError::NotActive
      | CreativeError::Expired
      | CreativeError::NotCompleted
      | CreativeError::EmptySubmission => ApiError::BadRequest(e.to_string()),
      CreativeError::InvalidDuration(_) => ApiError::Unprocessable(e.to_string()),
      CreativeError::Evaluation(_) => ApiError::Upstream(e.to_string()),
    }
  }
}

impl From<FunFactError> for ApiError {
  fn from(e: FunFactError) -> Self {
    ApiError::Upstream(e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = match &self {
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
      ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
    };
    (status, Json(json!({ "error": kind, "message": self.to_string() }))).into_response()
  }
}
