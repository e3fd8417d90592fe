//! Deterministic answer canonicalization used by the fallback comparator.

/// Lowercase, drop every character that is neither a word character
/// (alphanumeric or `_`) nor whitespace, then trim the ends.
/// Internal spacing is preserved as-is.
pub fn normalize(text: &str) -> String {
  text
    .to_lowercase()
    .chars()
    .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
    .collect::<String>()
    .trim()
    .to_string()
}

/// Fallback equality: both answers agree after normalization.
pub fn answers_match(correct: &str, user: &str) -> bool {
  normalize(correct) == normalize(user)
}
