//! Challenge state machine shared by the quiz and riddle games.
//!
//! One instance holds at most one active record. Transitions:
//!   Empty/Active/Exhausted --generate--> Active
//!   Active --correct--> Active (complexity + 1)
//!   Active --wrong, budget left--> Active
//!   Active --wrong, budget spent--> Exhausted (answer revealed)
//!   any --reset--> Empty
//!
//! Instances are not internally synchronized; `session::SessionStore` hands
//! them out behind a mutex.

use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::difficulty::{Attempts, Complexity, MAX_ATTEMPTS};
use crate::domain::{AnswerOutcome, ChallengeRecord, GameKind, GamePhase};
use crate::error::{CapabilityError, GenerateError, GenerateFailure};
use crate::extract::{option_text, parse_quiz, parse_riddle};
use crate::llm::{Conversation, GenerationRequest, ModelTier, Sampling, SharedCapability};
use crate::normalize::answers_match;
use crate::seeds::{PLACEHOLDER_CONTENT, PLACEHOLDER_HINT_CONFIG, PLACEHOLDER_HINT_RETRY};
use crate::util::{fill_template, trunc_for_log};
use crate::verify::AnswerVerifier;

/// A freshly generated challenge, as handed to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedChallenge {
  pub kind: GameKind,
  pub content: String,
  pub options: Vec<String>,
  pub hint: String,
  pub complexity: u8,
  pub attempts_remaining: u8,
}

pub struct ChallengeStateMachine {
  kind: GameKind,
  capability: SharedCapability,
  verifier: AnswerVerifier,
  system: String,
  user_template: String,
  sampling: Sampling,
  conversation: Conversation,
  record: Option<ChallengeRecord>,
  phase: GamePhase,
  complexity: Complexity,
  attempts: Attempts,
}

impl ChallengeStateMachine {
  pub fn new(
    kind: GameKind,
    capability: SharedCapability,
    verifier: AnswerVerifier,
    prompts: &Prompts,
    sampling: Sampling,
  ) -> Self {
    let (system, user_template) = match kind {
      GameKind::Quiz => (&prompts.quiz_system, &prompts.quiz_user_template),
      GameKind::Riddle => (&prompts.riddle_system, &prompts.riddle_user_template),
    };
    Self {
      kind,
      capability,
      verifier,
      system: system.clone(),
      user_template: user_template.clone(),
      sampling,
      conversation: Conversation::default(),
      record: None,
      phase: GamePhase::Empty,
      complexity: Complexity::default(),
      attempts: Attempts::default(),
    }
  }

  pub fn kind(&self) -> GameKind {
    self.kind
  }

  pub fn phase(&self) -> GamePhase {
    self.phase
  }

  pub fn complexity(&self) -> u8 {
    self.complexity.get()
  }

  pub fn attempts(&self) -> u8 {
    self.attempts.used()
  }

  pub fn record(&self) -> Option<&ChallengeRecord> {
    self.record.as_ref()
  }

  /// Ask the capability for a new question/riddle at the current complexity
  /// (or `complexity_hint`, clamped). On failure the previous state is kept and
  /// the error carries a displayable placeholder.
  #[instrument(level = "info", skip(self), fields(game = self.kind.as_str(), complexity = self.complexity.get()))]
  pub async fn generate_challenge(&mut self, complexity_hint: Option<u8>) -> Result<GeneratedChallenge, GenerateError> {
    let level = complexity_hint.map(Complexity::new).unwrap_or(self.complexity);

    let Some(capability) = self.capability.clone() else {
      error!(target: "game", game = self.kind.as_str(), "No text generation capability; cannot generate.");
      return Err(self.generate_error(CapabilityError::Unavailable.into()));
    };

    let prompt = fill_template(&self.user_template, &[("complexity", &level.get().to_string())]);
    let request = GenerationRequest::in_conversation(&self.system, &self.conversation, &prompt, self.sampling, ModelTier::Strong);
    let raw = match capability.generate(request).await {
      Ok(raw) => raw,
      Err(e) => {
        error!(target: "game", game = self.kind.as_str(), error = %e, "Generation call failed");
        return Err(self.generate_error(e.into()));
      }
    };

    let parsed = match self.kind {
      GameKind::Quiz => parse_quiz(&raw).map(|q| ChallengeRecord {
        content: q.question,
        options: q.options,
        hint: q.hint,
        correct_answer: q.answer,
      }),
      GameKind::Riddle => parse_riddle(&raw).map(|r| ChallengeRecord {
        content: r.riddle,
        options: Vec::new(),
        hint: r.hint,
        correct_answer: r.answer,
      }),
    };
    let record = match parsed {
      Ok(record) => record,
      Err(failure) => {
        let missing: Vec<&str> = failure.missing.iter().map(|s| s.label()).collect();
        error!(target: "game", game = self.kind.as_str(), ?missing, raw = %trunc_for_log(&failure.raw, 400), "Could not parse model reply");
        return Err(self.generate_error(failure.into()));
      }
    };

    self.conversation.push_exchange(&prompt, &raw);
    self.attempts.reset();
    self.phase = GamePhase::Active;
    info!(target: "game", game = self.kind.as_str(), complexity = level.get(), options = record.options.len(), "New challenge generated");

    let out = GeneratedChallenge {
      kind: self.kind,
      content: record.content.clone(),
      options: record.options.clone(),
      hint: record.hint.clone(),
      complexity: level.get(),
      attempts_remaining: MAX_ATTEMPTS,
    };
    self.record = Some(record);
    Ok(out)
  }

  /// Judge `user_answer` against the active record and advance the state.
  #[instrument(level = "info", skip(self, user_answer), fields(game = self.kind.as_str(), answer_len = user_answer.len()))]
  pub async fn check_answer(&mut self, user_answer: &str) -> AnswerOutcome {
    let Some(record) = self.record.clone() else {
      info!(target: "game", game = self.kind.as_str(), "Answer submitted with no active challenge");
      return AnswerOutcome::NoActiveChallenge;
    };

    let user_answer = user_answer.trim();
    let spent = self.attempts.consume();
    if user_answer == record.correct_answer.trim() {
      return self.advance();
    }
    let correct = resolve_stored(&record.options, &record.correct_answer);

    let candidate = match resolve_user_choice(&record.options, user_answer) {
      Choice::Text(text) => text,
      Choice::OutOfRange => {
        warn!(target: "game", game = self.kind.as_str(), input = user_answer, "Option number out of range");
        if spent {
          return self.reveal(correct, record.hint);
        }
        self.phase = GamePhase::Active;
        return AnswerOutcome::InvalidOption { remaining: self.attempts.remaining(), hint: record.hint };
      }
    };

    if self.verifier.verify(&correct, &candidate).await {
      return self.advance();
    }

    if spent {
      return self.reveal(correct, record.hint);
    }
    self.phase = GamePhase::Active;
    info!(target: "game", game = self.kind.as_str(), remaining = self.attempts.remaining(), "Wrong answer");
    AnswerOutcome::Incorrect { remaining: self.attempts.remaining(), hint: record.hint }
  }

  /// Drop the record and the conversation; back to complexity 1.
  pub fn reset(&mut self) {
    self.record = None;
    self.conversation.clear();
    self.complexity = Complexity::default();
    self.attempts.reset();
    self.phase = GamePhase::Empty;
    info!(target: "game", game = self.kind.as_str(), "Game reset");
  }

  fn advance(&mut self) -> AnswerOutcome {
    self.complexity = self.complexity.advanced();
    self.attempts.reset();
    self.phase = GamePhase::Active;
    info!(target: "game", game = self.kind.as_str(), complexity = self.complexity.get(), "Correct answer");
    AnswerOutcome::Correct { complexity: self.complexity.get() }
  }

  fn reveal(&mut self, answer: String, hint: String) -> AnswerOutcome {
    self.attempts.reset();
    self.phase = GamePhase::Exhausted;
    info!(target: "game", game = self.kind.as_str(), "Attempts exhausted; answer revealed");
    AnswerOutcome::Revealed { answer, hint }
  }

  fn generate_error(&self, source: GenerateFailure) -> GenerateError {
    let hint = match &source {
      GenerateFailure::Capability(e) if e.is_unavailable() => PLACEHOLDER_HINT_CONFIG,
      _ => PLACEHOLDER_HINT_RETRY,
    };
    GenerateError {
      source,
      placeholder_content: PLACEHOLDER_CONTENT.to_string(),
      placeholder_hint: hint.to_string(),
      complexity: self.complexity.get(),
      attempts_remaining: MAX_ATTEMPTS,
    }
  }
}

enum Choice {
  Text(String),
  OutOfRange,
}

/// Map a 1-based numeral, a bare option letter or an option's own text
/// (without its `X)` marker) to the option's raw line.
fn resolve_user_choice(options: &[String], input: &str) -> Choice {
  if options.is_empty() {
    return Choice::Text(input.to_string());
  }
  if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
    return match input.parse::<usize>() {
      Ok(n) if (1..=options.len()).contains(&n) => Choice::Text(options[n - 1].clone()),
      _ => Choice::OutOfRange,
    };
  }
  if let Some(option) = resolve_letter(options, input) {
    return Choice::Text(option.to_string());
  }
  match options.iter().find(|o| answers_match(option_text(o), input)) {
    Some(option) => Choice::Text(option.clone()),
    None => Choice::Text(input.to_string()),
  }
}

/// The stored answer goes through the same resolution as user input, so a
/// stored `"2"`, `"B"` or option text all compare against the option line.
fn resolve_stored(options: &[String], stored: &str) -> String {
  let stored = stored.trim();
  match resolve_user_choice(options, stored) {
    Choice::Text(text) => text,
    Choice::OutOfRange => stored.to_string(),
  }
}

/// `"b"`, `"B)"` or `"B."` select the option whose marker is `B`.
fn resolve_letter<'a>(options: &'a [String], input: &str) -> Option<&'a str> {
  let trimmed = input.trim().trim_end_matches([')', '.']);
  let mut chars = trimmed.chars();
  let letter = chars.next()?.to_ascii_uppercase();
  if chars.next().is_some() || !letter.is_ascii_alphabetic() {
    return None;
  }
  options
    .iter()
    .find(|o| o.chars().next().map(|c| c.to_ascii_uppercase()) == Some(letter))
    .map(String::as_str)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::llm::testing::{shared, ScriptedCapability};

  const RIDDLE: &str = "RIDDLE: I am a ledger nobody owns. What am I?\nHINT: It is shared\nANSWER: Blockchain";
  const QUIZ: &str = "Question (Complexity Level 1): What secures BNB Smart Chain?\nOptions:\nA) Proof of Work\nB) Proof of Stake\nC) Proof of Space\nD) Proof of Burn\nHint: Validators stake.\nANSWER: A";

  fn machine(kind: GameKind, gen: &Arc<ScriptedCapability>) -> ChallengeStateMachine {
    ChallengeStateMachine::new(kind, shared(gen), AnswerVerifier::local(), &Prompts::default(), Sampling::creative())
  }

  fn machine_with_verifier(kind: GameKind, gen: &Arc<ScriptedCapability>, judge: &Arc<ScriptedCapability>) -> ChallengeStateMachine {
    let verifier = AnswerVerifier::new(shared(judge), &Prompts::default(), Sampling::evaluation());
    ChallengeStateMachine::new(kind, shared(gen), verifier, &Prompts::default(), Sampling::creative())
  }

  #[tokio::test]
  async fn generate_riddle_populates_record() {
    let gen = ScriptedCapability::replying(&[RIDDLE]);
    let mut m = machine(GameKind::Riddle, &gen);
    assert_eq!(m.phase(), GamePhase::Empty);

    let out = m.generate_challenge(None).await.unwrap();
    assert_eq!(out.content, "I am a ledger nobody owns. What am I?");
    assert_eq!(out.attempts_remaining, MAX_ATTEMPTS);
    assert!(out.options.is_empty());
    assert_eq!(m.phase(), GamePhase::Active);
    assert_eq!(m.record().unwrap().correct_answer, "Blockchain");
    assert!(gen.last_prompt().unwrap().contains("Complexity Level: 1"));
  }

  #[tokio::test]
  async fn later_generations_carry_the_conversation() {
    let gen = ScriptedCapability::replying(&[RIDDLE, RIDDLE]);
    let mut m = machine(GameKind::Riddle, &gen);
    m.generate_challenge(None).await.unwrap();
    m.generate_challenge(Some(4)).await.unwrap();

    let seen = gen.seen.lock().unwrap();
    assert_eq!(seen[0].turns.len(), 1);
    assert_eq!(seen[1].turns.len(), 3);
    assert_eq!(seen[1].turns[1].content, RIDDLE);
    assert!(seen[1].turns[2].content.contains("Complexity Level: 4"));
  }

  #[tokio::test]
  async fn unavailable_capability_yields_placeholder_error() {
    let mut m = ChallengeStateMachine::new(GameKind::Quiz, None, AnswerVerifier::local(), &Prompts::default(), Sampling::creative());
    let err = m.generate_challenge(None).await.unwrap_err();
    assert!(matches!(err.source, GenerateFailure::Capability(CapabilityError::Unavailable)));
    assert_eq!(err.placeholder_content, PLACEHOLDER_CONTENT);
    assert_eq!(err.placeholder_hint, PLACEHOLDER_HINT_CONFIG);
    assert_eq!(m.phase(), GamePhase::Empty);
  }

  #[tokio::test]
  async fn parse_failure_is_typed_and_keeps_previous_state() {
    let gen = ScriptedCapability::replying(&[RIDDLE, "RIDDLE: I am?\nHINT: no answer here"]);
    let mut m = machine(GameKind::Riddle, &gen);
    m.generate_challenge(None).await.unwrap();

    let err = m.generate_challenge(None).await.unwrap_err();
    match &err.source {
      GenerateFailure::Parse(p) => assert!(p.raw.contains("no answer here")),
      other => panic!("unexpected failure {other:?}"),
    }
    assert_eq!(err.placeholder_hint, PLACEHOLDER_HINT_RETRY);
    assert_eq!(m.record().unwrap().correct_answer, "Blockchain");
    // no automatic retry
    assert_eq!(gen.calls(), 2);
  }

  #[tokio::test]
  async fn no_active_challenge_does_not_mutate() {
    let gen = ScriptedCapability::replying(&[]);
    let mut m = machine(GameKind::Riddle, &gen);
    assert_eq!(m.check_answer("anything").await, AnswerOutcome::NoActiveChallenge);
    assert_eq!(m.attempts(), 0);
  }

  #[tokio::test]
  async fn attempt_budget_reveals_then_restarts_cycle() {
    let gen = ScriptedCapability::replying(&[RIDDLE]);
    let mut m = machine(GameKind::Riddle, &gen);
    m.generate_challenge(None).await.unwrap();

    for expected in (1..MAX_ATTEMPTS).rev() {
      let out = m.check_answer("a database").await;
      assert_eq!(out, AnswerOutcome::Incorrect { remaining: expected, hint: "It is shared".into() });
    }
    let fifth = m.check_answer("a database").await;
    assert!(matches!(&fifth, AnswerOutcome::Revealed { answer, .. } if answer == "Blockchain"));
    assert_eq!(m.attempts(), 0);
    assert_eq!(m.phase(), GamePhase::Exhausted);

    let sixth = m.check_answer("a database").await;
    assert_eq!(sixth.attempts_remaining(), Some(MAX_ATTEMPTS - 1));
    assert_eq!(m.phase(), GamePhase::Active);
  }

  #[tokio::test]
  async fn exact_answer_wins_regardless_of_verifier() {
    let gen = ScriptedCapability::replying(&[RIDDLE]);
    let judge = ScriptedCapability::replying(&["DIFFERENT"]);
    let mut m = machine_with_verifier(GameKind::Riddle, &gen, &judge);
    m.generate_challenge(None).await.unwrap();
    let stored = m.record().unwrap().correct_answer.clone();

    assert_eq!(m.check_answer(&stored).await, AnswerOutcome::Correct { complexity: 2 });
    assert_eq!(judge.calls(), 0);
  }

  #[tokio::test]
  async fn complexity_rises_and_caps() {
    let gen = ScriptedCapability::replying(&[RIDDLE]);
    let mut m = machine(GameKind::Riddle, &gen);
    m.generate_challenge(None).await.unwrap();

    let mut last = m.complexity();
    for _ in 0..8 {
      m.check_answer("nope").await;
      m.check_answer("blockchain!").await;
      assert!(m.complexity() >= last);
      last = m.complexity();
    }
    assert_eq!(m.complexity(), 5);
    m.reset();
    assert_eq!(m.complexity(), 1);
  }

  #[tokio::test]
  async fn numeral_selects_option_text() {
    let gen = ScriptedCapability::replying(&[QUIZ]);
    let judge = ScriptedCapability::replying(&["DIFFERENT"]);
    let mut m = machine_with_verifier(GameKind::Quiz, &gen, &judge);
    m.generate_challenge(None).await.unwrap();

    let out = m.check_answer("2").await;
    assert!(matches!(out, AnswerOutcome::Incorrect { remaining: 4, .. }));
    let prompt = judge.last_prompt().unwrap();
    assert!(prompt.contains("User Answer: B) Proof of Stake"));
    assert!(prompt.contains("Correct Answer: A) Proof of Work"));
  }

  #[tokio::test]
  async fn numeral_or_letter_matching_stored_letter_is_correct() {
    let gen = ScriptedCapability::replying(&[QUIZ, QUIZ]);
    let mut m = machine(GameKind::Quiz, &gen);
    m.generate_challenge(None).await.unwrap();
    assert!(m.check_answer("1").await.is_correct());
    m.generate_challenge(None).await.unwrap();
    assert!(m.check_answer("a").await.is_correct());
    assert_eq!(m.complexity(), 3);
  }

  #[tokio::test]
  async fn out_of_range_numeral_counts_but_skips_verifier() {
    let gen = ScriptedCapability::replying(&[QUIZ]);
    let judge = ScriptedCapability::replying(&["EQUIVALENT"]);
    let mut m = machine_with_verifier(GameKind::Quiz, &gen, &judge);
    m.generate_challenge(None).await.unwrap();

    let out = m.check_answer("7").await;
    assert_eq!(out, AnswerOutcome::InvalidOption { remaining: 4, hint: "Validators stake.".into() });
    assert_eq!(m.attempts(), 1);
    assert_eq!(judge.calls(), 0);

    for _ in 0..3 {
      m.check_answer("0").await;
    }
    assert!(matches!(m.check_answer("99999999999999999999999").await, AnswerOutcome::Revealed { .. }));
    assert_eq!(m.phase(), GamePhase::Exhausted);
  }

  #[tokio::test]
  async fn reset_clears_everything() {
    let gen = ScriptedCapability::replying(&[RIDDLE]);
    let mut m = machine(GameKind::Riddle, &gen);
    m.generate_challenge(None).await.unwrap();
    m.check_answer("Blockchain").await;
    m.reset();
    assert_eq!(m.phase(), GamePhase::Empty);
    assert!(m.record().is_none());
    assert_eq!(m.check_answer("Blockchain").await, AnswerOutcome::NoActiveChallenge);
  }

  #[tokio::test]
  async fn numeral_stored_answer_matches_itself() {
    let reply = "Question: Which layer settles BNB Chain?\nOptions:\nA) one\nB) two\nC) three\nD) four\nHint: h\nANSWER: 2";
    let gen = ScriptedCapability::replying(&[reply, reply, reply]);
    let mut m = machine(GameKind::Quiz, &gen);

    m.generate_challenge(None).await.unwrap();
    let stored = m.record().unwrap().correct_answer.clone();
    assert_eq!(stored, "2");
    assert!(m.check_answer(&stored).await.is_correct());

    m.generate_challenge(None).await.unwrap();
    assert!(m.check_answer("b").await.is_correct());

    m.generate_challenge(None).await.unwrap();
    assert!(matches!(m.check_answer("1").await, AnswerOutcome::Incorrect { remaining: 4, .. }));
  }

  #[tokio::test]
  async fn exact_stored_answer_wins_before_option_translation() {
    let gen = ScriptedCapability::replying(&[QUIZ]);
    let judge = ScriptedCapability::replying(&["DIFFERENT"]);
    let mut m = machine_with_verifier(GameKind::Quiz, &gen, &judge);
    m.generate_challenge(None).await.unwrap();
    assert!(m.check_answer(" A ").await.is_correct());
    assert_eq!(judge.calls(), 0);
  }

  #[tokio::test]
  async fn option_text_without_marker_selects_the_option() {
    let gen = ScriptedCapability::replying(&[QUIZ, QUIZ]);
    let mut m = machine(GameKind::Quiz, &gen);
    m.generate_challenge(None).await.unwrap();
    assert!(m.check_answer("proof of work").await.is_correct());

    m.generate_challenge(None).await.unwrap();
    let out = m.check_answer("Proof of Stake").await;
    assert!(matches!(out, AnswerOutcome::Incorrect { remaining: 4, .. }));
  }

  #[test]
  fn resolve_letter_variants() {
    let opts = vec!["A) one".to_string(), "B) two".to_string()];
    assert_eq!(resolve_letter(&opts, "b"), Some("B) two"));
    assert_eq!(resolve_letter(&opts, "B)"), Some("B) two"));
    assert_eq!(resolve_letter(&opts, "C"), None);
    assert_eq!(resolve_letter(&opts, "Bee"), None);
  }
}
