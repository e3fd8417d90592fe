//! Fixed fallback content that keeps the app usable when the text-generation
//! capability is missing or misbehaving.

/// Shown instead of a question/riddle when generation fails.
pub const PLACEHOLDER_CONTENT: &str = "Technical difficulty encountered";
pub const PLACEHOLDER_HINT_RETRY: &str = "Please try again";
pub const PLACEHOLDER_HINT_CONFIG: &str = "Please check API configuration";

/// Shared by quiz and riddle.
pub const BREAK_SUGGESTIONS: [&str; 5] = [
  "Check your current ranking on the leaderboard.",
  "View your achievements and badges.",
  "Review the questions you answered correctly and incorrectly.",
  "Learn some fun facts or trivia about blockchain and Web3.",
  "Play a short mini-game or puzzle related to blockchain.",
];

pub fn break_suggestions_text() -> String {
  let mut out = String::from("Sure! Here are some fun options:");
  for (i, item) in BREAK_SUGGESTIONS.iter().enumerate() {
    out.push_str(&format!("\n{}. {}", i + 1, item));
  }
  out
}

pub const FALLBACK_WRITING_PROMPT: &str = "Write about blockchain technology's future.";
pub const FALLBACK_WRITING_CRITERIA: &str = "Evaluate based on creativity and technical accuracy.";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn break_text_lists_five_numbered_items() {
    let text = break_suggestions_text();
    assert_eq!(text.lines().count(), 6);
    assert!(text.contains("\n5. Play a short mini-game"));
  }
}
