//! Semantic answer verification with a normalized-text fallback.
//!
//! `verify` always yields a boolean: capability problems are logged and the
//! normalizer comparison decides instead.

use tracing::{debug, instrument, warn};

use crate::config::Prompts;
use crate::llm::{GenerationRequest, ModelTier, Sampling, SharedCapability};
use crate::normalize::answers_match;
use crate::util::{fill_template, trunc_for_log};

const EQUIVALENT: &str = "EQUIVALENT";

#[derive(Clone)]
pub struct AnswerVerifier {
  capability: SharedCapability,
  system: String,
  user_template: String,
  sampling: Sampling,
}

impl AnswerVerifier {
  pub fn new(capability: SharedCapability, prompts: &Prompts, sampling: Sampling) -> Self {
    Self {
      capability,
      system: prompts.verification_system.clone(),
      user_template: prompts.verification_user_template.clone(),
      sampling,
    }
  }

  /// Verifier with no capability: normalized comparison only.
  pub fn local() -> Self {
    Self::new(None, &Prompts::default(), Sampling::evaluation())
  }

  #[instrument(level = "info", skip_all, fields(correct_len = correct.len(), user_len = user.len()))]
  pub async fn verify(&self, correct: &str, user: &str) -> bool {
    if correct == user {
      return true;
    }

    let Some(capability) = &self.capability else {
      debug!(target: "game", "No capability configured; normalized comparison.");
      return answers_match(correct, user);
    };

    let prompt = fill_template(&self.user_template, &[("correct", correct), ("user", user)]);
    let request = GenerationRequest::single(&self.system, &prompt, self.sampling, ModelTier::Fast);
    match capability.generate(request).await {
      Ok(reply) => {
        let verdict = reply.to_uppercase().contains(EQUIVALENT);
        debug!(target: "game", reply = %trunc_for_log(&reply, 60), verdict, "Verification reply");
        verdict
      }
      Err(e) => {
        warn!(target: "game", error = %e, "Verification call failed; using normalized comparison.");
        answers_match(correct, user)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CapabilityError;
  use crate::llm::testing::{shared, ScriptedCapability};

  fn with(cap: &std::sync::Arc<ScriptedCapability>) -> AnswerVerifier {
    AnswerVerifier::new(shared(cap), &Prompts::default(), Sampling::evaluation())
  }

  #[tokio::test]
  async fn unavailable_capability_uses_normalizer() {
    let v = AnswerVerifier::local();
    assert!(v.verify("Proof of Stake", "  proof of stake.").await);
    assert!(!v.verify("PoS", "PoW").await);
  }

  #[tokio::test]
  async fn equivalent_token_decides() {
    let cap = ScriptedCapability::replying(&["equivalent", "DIFFERENT", "I think these are Equivalent."]);
    let v = with(&cap);
    assert!(v.verify("Validator", "a node that validates").await);
    assert!(!v.verify("PoS", "pos").await);
    assert!(v.verify("BNB", "Binance Coin").await);

    let prompt = cap.last_prompt().unwrap();
    assert!(prompt.contains("Correct Answer: BNB"));
    assert!(prompt.contains("User Answer: Binance Coin"));
  }

  #[tokio::test]
  async fn malformed_reply_is_not_a_match() {
    let cap = ScriptedCapability::replying(&["maybe?"]);
    assert!(!with(&cap).verify("proof of stake", "Proof of Stake").await);
  }

  #[tokio::test]
  async fn call_failure_falls_back_to_normalizer() {
    let cap = ScriptedCapability::new(vec![
      Err(CapabilityError::Http("timeout".into())),
      Err(CapabilityError::EmptyReply),
    ]);
    let v = with(&cap);
    assert!(v.verify("Proof of Stake", "proof of stake!").await);
    assert!(!v.verify("PoS", "PoW").await);
    assert_eq!(cap.calls(), 2);
  }

  #[tokio::test]
  async fn identical_answers_skip_the_capability() {
    let cap = ScriptedCapability::replying(&["DIFFERENT"]);
    assert!(with(&cap).verify("B", "B").await);
    assert_eq!(cap.calls(), 0);
  }
}
