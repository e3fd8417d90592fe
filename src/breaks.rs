//! Break suggestions offered after a round ends.

use tracing::{instrument, warn};

use crate::config::Prompts;
use crate::domain::GameKind;
use crate::llm::{GenerationRequest, ModelTier, Sampling, SharedCapability};
use crate::seeds::break_suggestions_text;
use crate::util::fill_template;

#[derive(Clone)]
pub struct BreakSuggestionProvider {
  capability: SharedCapability,
  system: String,
  user_template: String,
  sampling: Sampling,
}

impl BreakSuggestionProvider {
  pub fn new(capability: SharedCapability, prompts: &Prompts, system: &str, sampling: Sampling) -> Self {
    Self {
      capability,
      system: system.to_string(),
      user_template: prompts.break_user_template.clone(),
      sampling,
    }
  }

  /// One capability call; the fixed five-item list on any failure.
  #[instrument(level = "info", skip(self), fields(game = game.as_str()))]
  pub async fn suggest(&self, game: GameKind) -> String {
    let Some(capability) = &self.capability else {
      return break_suggestions_text();
    };
    let prompt = fill_template(&self.user_template, &[("game", game.as_str())]);
    let request = GenerationRequest::single(&self.system, &prompt, self.sampling, ModelTier::Fast);
    match capability.generate(request).await {
      Ok(text) => text,
      Err(e) => {
        warn!(target: "game", error = %e, "Break suggestion call failed; using fixed list.");
        break_suggestions_text()
      }
    }
  }
}
