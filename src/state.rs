//! Application state: resolved config, the optional text-generation
//! capability and every component built on top of it.
//!
//! If the capability is unavailable every component still works where a
//! fallback exists (verification, break suggestions, writing prompts); quiz,
//! riddle and fun-fact generation report typed errors instead.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::breaks::BreakSuggestionProvider;
use crate::config::AppConfig;
use crate::creative::CreativeWriting;
use crate::fun_facts::FunFactGenerator;
use crate::llm::{OpenAI, SharedCapability, TextGeneration};
use crate::session::SessionStore;
use crate::verify::AnswerVerifier;

pub struct AppState {
  pub capability: SharedCapability,
  pub sessions: SessionStore,
  pub breaks: BreakSuggestionProvider,
  pub fun_facts: FunFactGenerator,
  pub creative: CreativeWriting,
}

impl AppState {
  /// Build state from config, wiring the OpenAI client when a key is present.
  #[instrument(level = "info", skip_all)]
  pub fn new(config: &AppConfig) -> Self {
    let capability: SharedCapability = match OpenAI::from_settings(&config.llm) {
      Some(oa) => {
        info!(target: "questbot_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        Some(Arc::new(oa))
      }
      None => {
        info!(target: "questbot_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local fallbacks.");
        None
      }
    };
    Self::with_capability(config, capability)
  }

  /// Same wiring with an explicit capability (tests inject fakes here).
  pub fn with_capability(config: &AppConfig, capability: SharedCapability) -> Self {
    let prompts = &config.prompts;
    let sampling = &config.sampling;
    let verifier = AnswerVerifier::new(capability.clone(), prompts, sampling.evaluation);

    Self {
      sessions: SessionStore::new(capability.clone(), verifier, prompts.clone(), sampling.challenge)
        .with_idle_ttl(chrono::Duration::minutes(config.session_idle_minutes)),
      breaks: BreakSuggestionProvider::new(capability.clone(), prompts, &prompts.quiz_system, sampling.challenge),
      fun_facts: FunFactGenerator::new(capability.clone(), prompts, sampling.fun_facts),
      creative: CreativeWriting::new(capability.clone(), prompts, sampling),
      capability,
    }
  }

  pub fn capability_description(&self) -> String {
    self.capability.as_deref().map(TextGeneration::describe).unwrap_or_else(|| "unavailable".into())
  }
}
