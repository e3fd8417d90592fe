//! Text-generation capability: the trait every game component talks to, the
//! conversation buffer used for stateful generation, and the OpenAI-compatible
//! chat.completions client that implements it.
//!
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::CapabilityError;

/// Shared handle to the capability. `None` means it is not configured or failed
/// to initialize, which switches every consumer to its local fallback.
pub type SharedCapability = Option<Arc<dyn TextGeneration>>;

/// Sampling parameters, fixed per use case.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Sampling {
  pub temperature: f32,
  pub top_p: f32,
  #[serde(default)]
  pub top_k: Option<u32>,
}

impl Sampling {
  /// Quiz and riddle generation.
  pub const fn creative() -> Self {
    Self { temperature: 0.7, top_p: 0.8, top_k: Some(40) }
  }

  /// Answer verification and submission evaluation.
  pub const fn evaluation() -> Self {
    Self { temperature: 0.2, top_p: 0.5, top_k: Some(20) }
  }
}

/// Which configured model a request should go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTier {
  Fast,
  Strong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
  pub role: Role,
  pub content: String,
}

/// Prior turns of one generation session, so the model can see what it
/// already produced and avoid repeating itself.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
  turns: Vec<ChatTurn>,
}

impl Conversation {
  // Oldest exchanges are dropped past this many turns.
  const MAX_TURNS: usize = 40;

  pub fn turns(&self) -> &[ChatTurn] {
    &self.turns
  }

  /// Record a completed user/assistant exchange.
  pub fn push_exchange(&mut self, prompt: &str, reply: &str) {
    self.turns.push(ChatTurn { role: Role::User, content: prompt.to_string() });
    self.turns.push(ChatTurn { role: Role::Assistant, content: reply.to_string() });
    if self.turns.len() > Self::MAX_TURNS {
      let excess = self.turns.len() - Self::MAX_TURNS;
      self.turns.drain(..excess);
    }
  }

  pub fn clear(&mut self) {
    self.turns.clear();
  }
}

/// One call to the capability.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub system: String,
  /// Conversation so far, ending with the new user prompt.
  pub turns: Vec<ChatTurn>,
  pub sampling: Sampling,
  pub tier: ModelTier,
  /// Ask the backend for a strict JSON object.
  pub json: bool,
}

impl GenerationRequest {
  pub fn single(system: &str, prompt: &str, sampling: Sampling, tier: ModelTier) -> Self {
    Self {
      system: system.to_string(),
      turns: vec![ChatTurn { role: Role::User, content: prompt.to_string() }],
      sampling,
      tier,
      json: false,
    }
  }

  pub fn in_conversation(
    system: &str,
    conversation: &Conversation,
    prompt: &str,
    sampling: Sampling,
    tier: ModelTier,
  ) -> Self {
    let mut turns = conversation.turns().to_vec();
    turns.push(ChatTurn { role: Role::User, content: prompt.to_string() });
    Self { system: system.to_string(), turns, sampling, tier, json: false }
  }

  pub fn json(mut self) -> Self {
    self.json = true;
    self
  }
}

#[async_trait]
pub trait TextGeneration: Send + Sync {
  /// Produce raw text for the request. Empty replies are errors.
  async fn generate(&self, request: GenerationRequest) -> Result<String, CapabilityError>;

  /// Short description for health/startup logs.
  fn describe(&self) -> String;
}

/// Run a JSON-mode request and decode the reply into `T`.
pub async fn generate_json<T: DeserializeOwned>(
  capability: &dyn TextGeneration,
  request: GenerationRequest,
) -> Result<T, CapabilityError> {
  let text = capability.generate(request.json()).await?;
  serde_json::from_str::<T>(&text).map_err(|e| CapabilityError::Decode(format!("JSON parse error: {}", e)))
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
  /// Forward `top_k`; only OpenAI-compatible servers that accept it want this.
  pub send_top_k: bool,
}

impl OpenAI {
  /// Build the client from resolved settings; `None` when no key is set or the
  /// HTTP client cannot be built.
  pub fn from_settings(settings: &crate::config::LlmSettings) -> Option<Self> {
    let api_key = settings.api_key.clone()?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()
      .map_err(|e| error!(target: "questbot_backend", error = %e, "Failed to build HTTP client"))
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url: settings.base_url.clone(),
      fast_model: settings.fast_model.clone(),
      strong_model: settings.strong_model.clone(),
      send_top_k: settings.send_top_k,
    })
  }

  fn model_for(&self, tier: ModelTier) -> &str {
    match tier {
      ModelTier::Fast => &self.fast_model,
      ModelTier::Strong => &self.strong_model,
    }
  }

  #[instrument(level = "info", skip(self, req), fields(model = %model, turns = req.turns.len(), json = req.json))]
  async fn chat(&self, model: &str, req: &GenerationRequest) -> Result<String, CapabilityError> {
    let url = format!("{}/chat/completions", self.base_url);
    let mut messages = Vec::with_capacity(req.turns.len() + 1);
    if !req.system.is_empty() {
      messages.push(ChatMessageReq { role: "system", content: &req.system });
    }
    for turn in &req.turns {
      let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "assistant",
      };
      messages.push(ChatMessageReq { role, content: &turn.content });
    }

    let body = ChatCompletionRequest {
      model,
      messages,
      temperature: req.sampling.temperature,
      top_p: req.sampling.top_p,
      top_k: if self.send_top_k { req.sampling.top_k } else { None },
      response_format: req.json.then(|| ResponseFormat { r#type: "json_object" }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "questbot-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(CapabilityError::Api { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default().trim().to_string();

    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Model response received");
    if text.is_empty() {
      return Err(CapabilityError::EmptyReply);
    }
    Ok(text)
  }
}

#[async_trait]
impl TextGeneration for OpenAI {
  async fn generate(&self, request: GenerationRequest) -> Result<String, CapabilityError> {
    let model = self.model_for(request.tier).to_string();
    self.chat(&model, &request).await
  }

  fn describe(&self) -> String {
    format!("openai-compatible ({}, fast={}, strong={})", self.base_url, self.fast_model, self.strong_model)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
  top_p: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  top_k: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'static str, content: &'a str }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: &'static str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

/// In-process capabilities for tests: scripted replies, failures, and a
/// recorder of every request seen.
#[cfg(test)]
pub mod testing {
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::*;

  pub struct ScriptedCapability {
    replies: Mutex<VecDeque<Result<String, CapabilityError>>>,
    pub seen: Mutex<Vec<GenerationRequest>>,
    // When set, every call waits until `n` calls are in flight at once.
    gate: Option<tokio::sync::Barrier>,
  }

  impl ScriptedCapability {
    pub fn new(replies: Vec<Result<String, CapabilityError>>) -> Arc<Self> {
      Arc::new(Self { replies: Mutex::new(replies.into()), seen: Mutex::new(Vec::new()), gate: None })
    }

    /// Replies only once `n` generate calls are waiting concurrently.
    pub fn gated(texts: &[&str], n: usize) -> Arc<Self> {
      Arc::new(Self {
        replies: Mutex::new(texts.iter().map(|t| Ok(t.to_string())).collect()),
        seen: Mutex::new(Vec::new()),
        gate: Some(tokio::sync::Barrier::new(n)),
      })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
      Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn failing() -> Arc<Self> {
      Self::new(Vec::new())
    }

    pub fn last_prompt(&self) -> Option<String> {
      self.seen.lock().unwrap().last().and_then(|r| r.turns.last()).map(|t| t.content.clone())
    }

    pub fn calls(&self) -> usize {
      self.seen.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl TextGeneration for ScriptedCapability {
    async fn generate(&self, request: GenerationRequest) -> Result<String, CapabilityError> {
      self.seen.lock().unwrap().push(request);
      if let Some(gate) = &self.gate {
        gate.wait().await;
      }
      self.replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(CapabilityError::Http("connection refused".into())))
    }

    fn describe(&self) -> String {
      "scripted".into()
    }
  }

  pub fn shared(cap: &Arc<ScriptedCapability>) -> SharedCapability {
    Some(cap.clone() as Arc<dyn TextGeneration>)
  }
}
