//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Remove markdown emphasis markers and heading hashes from model output.
pub fn strip_markdown(text: &str) -> String {
  text
    .lines()
    .map(|line| line.trim_start_matches('#').trim_start().replace(['*', '`'], "").replace("__", ""))
    .collect::<Vec<_>>()
    .join("\n")
    .trim()
    .to_string()
}

/// Split a block of text into trimmed, non-empty lines.
pub fn non_empty_lines(text: &str) -> Vec<String> {
  text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and x then y");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "ééééé";
    let out = trunc_for_log(s, 3);
    assert!(out.starts_with('é'));
    assert!(out.ends_with("(10 bytes total)"));
  }

  #[test]
  fn strip_markdown_drops_emphasis_and_headings() {
    let out = strip_markdown("## Title\n**BNB** has `fast` blocks");
    assert_eq!(out, "Title\nBNB has fast blocks");
  }

  #[test]
  fn non_empty_lines_skips_blanks() {
    assert_eq!(non_empty_lines("a\n\n  b  \n"), vec!["a".to_string(), "b".to_string()]);
  }
}
