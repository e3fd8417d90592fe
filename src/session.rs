//! Per-session game instances.
//!
//! Each session id owns one quiz and one riddle state machine. Machines are
//! created lazily (only by question generation) and live behind their own
//! mutex, so concurrent requests for the same session are serialized while
//! different sessions run in parallel. Sessions idle longer than the TTL are
//! evicted whenever a new one is created.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::config::{Prompts, DEFAULT_SESSION_IDLE_MINUTES};
use crate::domain::GameKind;
use crate::game::ChallengeStateMachine;
use crate::llm::{Sampling, SharedCapability};
use crate::verify::AnswerVerifier;

pub const DEFAULT_SESSION: &str = "default";

pub type SharedMachine = Arc<Mutex<ChallengeStateMachine>>;

struct Slot {
  machine: SharedMachine,
  last_used: DateTime<Utc>,
}

type Table = Arc<RwLock<HashMap<String, Slot>>>;

#[derive(Clone)]
pub struct SessionStore {
  capability: SharedCapability,
  verifier: AnswerVerifier,
  prompts: Prompts,
  sampling: Sampling,
  idle_ttl: Duration,
  quiz: Table,
  riddle: Table,
}

impl SessionStore {
  pub fn new(capability: SharedCapability, verifier: AnswerVerifier, prompts: Prompts, sampling: Sampling) -> Self {
    Self {
      capability,
      verifier,
      prompts,
      sampling,
      idle_ttl: Duration::minutes(DEFAULT_SESSION_IDLE_MINUTES),
      quiz: Arc::new(RwLock::new(HashMap::new())),
      riddle: Arc::new(RwLock::new(HashMap::new())),
    }
  }

  pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
    self.idle_ttl = idle_ttl;
    self
  }

  fn table(&self, kind: GameKind) -> &Table {
    match kind {
      GameKind::Quiz => &self.quiz,
      GameKind::Riddle => &self.riddle,
    }
  }

  /// The machine for `(kind, session)`, created on first use.
  pub async fn machine(&self, kind: GameKind, session: &str) -> SharedMachine {
    self.machine_at(kind, session, Utc::now()).await
  }

  #[instrument(level = "debug", skip(self), fields(game = kind.as_str()))]
  pub async fn machine_at(&self, kind: GameKind, session: &str, now: DateTime<Utc>) -> SharedMachine {
    let mut table = self.table(kind).write().await;
    if let Some(slot) = table.get_mut(session) {
      slot.last_used = now;
      return slot.machine.clone();
    }

    self.evict_idle(kind, &mut table, now);
    debug!(target: "game", game = kind.as_str(), %session, "Creating game instance");
    let machine = Arc::new(Mutex::new(ChallengeStateMachine::new(
      kind,
      self.capability.clone(),
      self.verifier.clone(),
      &self.prompts,
      self.sampling,
    )));
    table.insert(session.to_string(), Slot { machine: machine.clone(), last_used: now });
    machine
  }

  /// The machine for `(kind, session)` if one exists and has not gone idle.
  /// Never creates one, so answers and resets for unknown sessions leave the
  /// store untouched.
  pub async fn existing(&self, kind: GameKind, session: &str) -> Option<SharedMachine> {
    self.existing_at(kind, session, Utc::now()).await
  }

  pub async fn existing_at(&self, kind: GameKind, session: &str, now: DateTime<Utc>) -> Option<SharedMachine> {
    let mut table = self.table(kind).write().await;
    let slot = table.get_mut(session)?;
    if now - slot.last_used > self.idle_ttl {
      table.remove(session);
      debug!(target: "game", game = kind.as_str(), %session, "Idle game instance evicted on lookup");
      return None;
    }
    slot.last_used = now;
    Some(slot.machine.clone())
  }

  /// Forget every game of a session (WebSocket disconnect).
  pub async fn drop_session(&self, session: &str) {
    self.quiz.write().await.remove(session);
    self.riddle.write().await.remove(session);
  }

  pub async fn len(&self) -> usize {
    self.quiz.read().await.len() + self.riddle.read().await.len()
  }

  fn evict_idle(&self, kind: GameKind, table: &mut HashMap<String, Slot>, now: DateTime<Utc>) {
    let before = table.len();
    table.retain(|_, slot| now - slot.last_used <= self.idle_ttl);
    let evicted = before - table.len();
    if evicted > 0 {
      info!(target: "game", game = kind.as_str(), evicted, "Evicted idle game sessions");
    }
  }
}
