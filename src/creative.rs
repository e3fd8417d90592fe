//! Timed creative-writing challenges.
//!
//! A challenge pairs a generated writing prompt with its evaluation criteria
//! and a deadline. Submissions are plain text; evaluation produces free-form
//! feedback plus structured scores. Challenges live in memory and are purged
//! one minute after their deadline, on every create.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{Prompts, SamplingProfiles};
use crate::error::{CapabilityError, CreativeError};
use crate::llm::{generate_json, Conversation, GenerationRequest, ModelTier, Sampling, SharedCapability};
use crate::seeds::{FALLBACK_WRITING_CRITERIA, FALLBACK_WRITING_PROMPT};
use crate::util::{fill_template, trunc_for_log};

const MAX_DURATION_MINUTES: u32 = 24 * 60;
const SECTION_1: &str = "SECTION 1";
const SECTION_2: &str = "SECTION 2";

fn purge_grace() -> Duration {
  Duration::minutes(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
  Minutes,
  Hours,
}

/// Requested challenge length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDuration {
  pub duration: u32,
  pub time_unit: TimeUnit,
}

impl ChallengeDuration {
  /// Length in minutes; at least one minute and at most 24 hours.
  pub fn minutes(&self) -> Result<u32, CreativeError> {
    if self.duration == 0 {
      return Err(CreativeError::InvalidDuration("Duration must be at least 1".into()));
    }
    let minutes = match self.time_unit {
      TimeUnit::Minutes => Some(self.duration),
      TimeUnit::Hours => self.duration.checked_mul(60),
    };
    match minutes {
      Some(m) if m <= MAX_DURATION_MINUTES => Ok(m),
      _ => Err(CreativeError::InvalidDuration("Duration cannot exceed 24 hours".into())),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
  Active,
  Expired,
  Completed,
  Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
  pub score: f32,
  #[serde(default)]
  pub feedback: String,
}

/// Structured scores extracted from the evaluation feedback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WritingScores {
  pub technical_understanding: CriterionScore,
  pub creativity: CriterionScore,
  pub clarity: CriterionScore,
  pub engagement: CriterionScore,
  pub adherence: CriterionScore,
  pub overall_score: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct WritingChallenge {
  pub id: Uuid,
  pub prompt: String,
  pub criteria: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub status: ChallengeStatus,
  pub duration: ChallengeDuration,
  pub submission: Option<String>,
  pub evaluation: Option<String>,
  pub scores: Option<WritingScores>,
}

pub struct CreativeWriting {
  capability: SharedCapability,
  prompts: Prompts,
  prompt_sampling: Sampling,
  evaluation_sampling: Sampling,
  conversation: Mutex<Conversation>,
  challenges: Arc<RwLock<HashMap<Uuid, WritingChallenge>>>,
}

impl CreativeWriting {
  pub fn new(capability: SharedCapability, prompts: &Prompts, sampling: &SamplingProfiles) -> Self {
    Self {
      capability,
      prompts: prompts.clone(),
      prompt_sampling: sampling.writing_prompt,
      evaluation_sampling: sampling.evaluation,
      conversation: Mutex::new(Conversation::default()),
      challenges: Arc::new(RwLock::new(HashMap::new())),
    }
  }

  /// A `(prompt, criteria)` pair; the fixed pair when generation fails or the
  /// reply has no `SECTION 2`.
  #[instrument(level = "info", skip(self))]
  pub async fn writing_prompt(&self) -> (String, String) {
    let fallback = || (FALLBACK_WRITING_PROMPT.to_string(), FALLBACK_WRITING_CRITERIA.to_string());
    let Some(capability) = &self.capability else {
      warn!(target: "creative", "No capability; using fallback writing prompt.");
      return fallback();
    };

    let request = GenerationRequest::in_conversation(
      "",
      &*self.conversation.lock().await,
      &self.prompts.writing_prompt_user,
      self.prompt_sampling,
      ModelTier::Strong,
    );
    let raw = match capability.generate(request).await {
      Ok(raw) => raw,
      Err(e) => {
        error!(target: "creative", error = %e, "Writing prompt generation failed; using fallback.");
        return fallback();
      }
    };

    match split_sections(&raw) {
      Some(pair) => {
        self.conversation.lock().await.push_exchange(&self.prompts.writing_prompt_user, &raw);
        pair
      }
      None => {
        warn!(target: "creative", raw = %trunc_for_log(&raw, 200), "Writing prompt reply lacks sections; using fallback.");
        fallback()
      }
    }
  }

  pub async fn create(&self, duration: ChallengeDuration) -> Result<WritingChallenge, CreativeError> {
    self.create_at(duration, Utc::now()).await
  }

  #[instrument(level = "info", skip(self))]
  pub async fn create_at(&self, duration: ChallengeDuration, now: DateTime<Utc>) -> Result<WritingChallenge, CreativeError> {
    let minutes = duration.minutes()?;
    self.purge_expired(now).await;

    let (prompt, criteria) = self.writing_prompt().await;
    let challenge = WritingChallenge {
      id: Uuid::new_v4(),
      prompt,
      criteria,
      start_time: now,
      end_time: now + Duration::minutes(i64::from(minutes)),
      status: ChallengeStatus::Active,
      duration,
      submission: None,
      evaluation: None,
      scores: None,
    };
    self.challenges.write().await.insert(challenge.id, challenge.clone());
    info!(target: "creative", id = %challenge.id, minutes, "Writing challenge created");
    Ok(challenge)
  }

  pub async fn evaluate(&self, id: Uuid, submission: &str) -> Result<String, CreativeError> {
    self.evaluate_at(id, submission, Utc::now()).await
  }

  /// Evaluate a submission and store feedback and scores. A failed evaluation
  /// marks the challenge `failed`.
  #[instrument(level = "info", skip(self, submission), fields(submission_len = submission.len()))]
  pub async fn evaluate_at(&self, id: Uuid, submission: &str, now: DateTime<Utc>) -> Result<String, CreativeError> {
    let (prompt, criteria) = {
      let mut challenges = self.challenges.write().await;
      let challenge = challenges.get_mut(&id).ok_or(CreativeError::NotFound)?;
      if challenge.status != ChallengeStatus::Active {
        return Err(CreativeError::NotActive);
      }
      if now > challenge.end_time {
        challenge.status = ChallengeStatus::Expired;
        return Err(CreativeError::Expired);
      }
      (challenge.prompt.clone(), challenge.criteria.clone())
    };
    let submission = submission.trim();
    if submission.is_empty() {
      return Err(CreativeError::EmptySubmission);
    }

    let evaluation = match self.run_evaluation(&prompt, &criteria, submission).await {
      Ok(text) => text,
      Err(e) => {
        error!(target: "creative", %id, error = %e, "Evaluation failed");
        self.set_status(id, ChallengeStatus::Failed).await;
        return Err(e.into());
      }
    };
    let scores = self.run_scoring(&evaluation).await;

    let mut challenges = self.challenges.write().await;
    let challenge = challenges.get_mut(&id).ok_or(CreativeError::NotFound)?;
    challenge.submission = Some(submission.to_string());
    challenge.evaluation = Some(evaluation.clone());
    challenge.scores = scores;
    challenge.status = ChallengeStatus::Completed;
    info!(target: "creative", %id, scored = challenge.scores.is_some(), "Submission evaluated");
    Ok(evaluation)
  }

  pub async fn scores(&self, id: Uuid) -> Result<WritingScores, CreativeError> {
    let challenges = self.challenges.read().await;
    let challenge = challenges.get(&id).ok_or(CreativeError::NotFound)?;
    if challenge.status != ChallengeStatus::Completed {
      return Err(CreativeError::NotCompleted);
    }
    challenge.scores.clone().ok_or(CreativeError::ScoresMissing)
  }

  pub async fn status(&self, id: Uuid) -> Result<WritingChallenge, CreativeError> {
    self.status_at(id, Utc::now()).await
  }

  /// Current state, marking an overdue active challenge `expired`.
  pub async fn status_at(&self, id: Uuid, now: DateTime<Utc>) -> Result<WritingChallenge, CreativeError> {
    let mut challenges = self.challenges.write().await;
    let challenge = challenges.get_mut(&id).ok_or(CreativeError::NotFound)?;
    if challenge.status == ChallengeStatus::Active && now > challenge.end_time {
      challenge.status = ChallengeStatus::Expired;
    }
    Ok(challenge.clone())
  }

  pub async fn len(&self) -> usize {
    self.challenges.read().await.len()
  }

  async fn purge_expired(&self, now: DateTime<Utc>) {
    let mut challenges = self.challenges.write().await;
    let before = challenges.len();
    challenges.retain(|_, c| now <= c.end_time + purge_grace());
    let purged = before - challenges.len();
    if purged > 0 {
      info!(target: "creative", purged, "Purged expired writing challenges");
    }
  }

  async fn set_status(&self, id: Uuid, status: ChallengeStatus) {
    if let Some(c) = self.challenges.write().await.get_mut(&id) {
      c.status = status;
    }
  }

  async fn run_evaluation(&self, prompt: &str, criteria: &str, submission: &str) -> Result<String, CapabilityError> {
    let capability = self.capability.as_ref().ok_or(CapabilityError::Unavailable)?;
    let user = fill_template(
      &self.prompts.writing_eval_user_template,
      &[("prompt", prompt), ("criteria", criteria), ("submission", submission)],
    );
    let request = GenerationRequest::single(&self.prompts.writing_eval_system, &user, self.evaluation_sampling, ModelTier::Fast);
    capability.generate(request).await
  }

  /// Scores are best effort: a completed evaluation without scores is kept.
  async fn run_scoring(&self, feedback: &str) -> Option<WritingScores> {
    let capability = self.capability.as_ref()?;
    let user = fill_template(&self.prompts.writing_scores_user_template, &[("feedback", feedback)]);
    let request = GenerationRequest::single(&self.prompts.writing_eval_system, &user, self.evaluation_sampling, ModelTier::Fast);
    match generate_json::<WritingScores>(capability.as_ref(), request).await {
      Ok(scores) => Some(scores),
      Err(e) => {
        warn!(target: "creative", error = %e, "Could not convert feedback into scores");
        None
      }
    }
  }
}

/// Split a reply on `SECTION 2`; the first part loses its `SECTION 1` header.
fn split_sections(raw: &str) -> Option<(String, String)> {
  let (first, second) = raw.split_once(SECTION_2)?;
  let second = match second.split_once(SECTION_2) {
    Some((s, _)) => s,
    None => second,
  };
  let prompt = first.replace(SECTION_1, "").trim().to_string();
  let criteria = second.trim().to_string();
  if prompt.is_empty() || criteria.is_empty() {
    return None;
  }
  Some((prompt, criteria))
}
