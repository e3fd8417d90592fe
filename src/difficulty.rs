//! Difficulty progression shared by every game: a complexity level in
//! `1..=5` that rises by one per correct answer, and a five-attempt budget.

use serde::Serialize;

pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 5;
pub const MAX_ATTEMPTS: u8 = 5;

/// Complexity level, always within `MIN_COMPLEXITY..=MAX_COMPLEXITY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Complexity(u8);

impl Complexity {
  /// Clamp an arbitrary level into range.
  pub fn new(level: u8) -> Self {
    Self(level.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY))
  }

  pub fn get(self) -> u8 {
    self.0
  }

  /// Next level after a correct answer, saturating at the top.
  pub fn advanced(self) -> Self {
    Self::new(self.0.saturating_add(1))
  }
}

impl Default for Complexity {
  fn default() -> Self {
    Self(MIN_COMPLEXITY)
  }
}

/// Attempt counter bounded by `MAX_ATTEMPTS`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attempts(u8);

impl Attempts {
  pub fn used(self) -> u8 {
    self.0
  }

  pub fn remaining(self) -> u8 {
    MAX_ATTEMPTS - self.0
  }

  /// Count one attempt; true when the budget is now spent.
  pub fn consume(&mut self) -> bool {
    self.0 = (self.0 + 1).min(MAX_ATTEMPTS);
    self.0 >= MAX_ATTEMPTS
  }

  pub fn reset(&mut self) {
    self.0 = 0;
  }
}
