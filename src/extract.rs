//! Section extraction: turn one free-text model reply into named sections.
//!
//! The pipeline is a fixed list of ordered rules:
//!   1. strip emphasis markup (`*`)
//!   2. per section label, take the text after `LABEL:` up to the next
//!      section delimiter (a line starting with an all-caps `TOKEN:` or with a
//!      known label) or end of text
//!   3. per-section heuristics when a label is absent (riddle opener, bare
//!      option lines)
//!   4. any required section still missing yields `ParseFailure` with the raw
//!      reply attached
//!
//! Extraction is pure. It never calls the model again; retrying is the caller's job.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ParseFailure;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
  Riddle,
  Question,
  Options,
  Hint,
  Answer,
}

impl Section {
  pub fn label(self) -> &'static str {
    match self {
      Section::Riddle => "RIDDLE",
      Section::Question => "QUESTION",
      Section::Options => "OPTIONS",
      Section::Hint => "HINT",
      Section::Answer => "ANSWER",
    }
  }

  fn label_regex(self) -> &'static Regex {
    match self {
      Section::Riddle => &RIDDLE_LABEL,
      Section::Question => &QUESTION_LABEL,
      Section::Options => &OPTIONS_LABEL,
      Section::Hint => &HINT_LABEL,
      Section::Answer => &ANSWER_LABEL,
    }
  }

  fn inline_regex(self) -> &'static Regex {
    match self {
      Section::Riddle => &RIDDLE_INLINE,
      Section::Question => &QUESTION_INLINE,
      Section::Options => &OPTIONS_INLINE,
      Section::Hint => &HINT_INLINE,
      Section::Answer => &ANSWER_INLINE,
    }
  }
}

/// The ordered set of sections a reply is expected to contain.
#[derive(Clone, Copy, Debug)]
pub struct Layout {
  pub sections: &'static [Section],
}

pub const RIDDLE_LAYOUT: Layout = Layout {
  sections: &[Section::Riddle, Section::Hint, Section::Answer],
};

pub const QUIZ_LAYOUT: Layout = Layout {
  sections: &[Section::Question, Section::Options, Section::Hint, Section::Answer],
};

// A label may carry a number and a parenthetical qualifier, e.g. "Question 1 (Complexity Level 2):".
// Each label gets a line-anchored pattern and an inline one for labels that
// follow chatter on the same line ("Here you go. RIDDLE: ...").
macro_rules! label_re {
  ($name:ident, $inline:ident, $label:literal) => {
    static $name: Lazy<Regex> = Lazy::new(|| {
      Regex::new(concat!(r"(?im)^[ \t>#-]*", $label, r"\b(?:[ \t]*#?[0-9]+)?(?:[ \t]*\([^)\n]*\))?[ \t]*:[ \t]*")).unwrap()
    });
    static $inline: Lazy<Regex> = Lazy::new(|| {
      Regex::new(concat!(r"(?i)\b", $label, r"\b(?:[ \t]*#?[0-9]+)?(?:[ \t]*\([^)\n]*\))?[ \t]*:[ \t]*")).unwrap()
    });
  };
}

label_re!(RIDDLE_LABEL, RIDDLE_INLINE, "riddle");
label_re!(QUESTION_LABEL, QUESTION_INLINE, "question");
label_re!(OPTIONS_LABEL, OPTIONS_INLINE, "options");
label_re!(HINT_LABEL, HINT_INLINE, "hint");
label_re!(ANSWER_LABEL, ANSWER_INLINE, "answer");

static DELIMITER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?m)^[ \t>#-]*(?:[A-Z][A-Z_]+:|(?i:riddle|question|options|hint|answer)\b(?:[ \t]*#?[0-9]+)?(?:[ \t]*\([^)\n]*\))?[ \t]*:)",
  )
  .unwrap()
});

static RIDDLE_OPENER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\b(?:I am|I'm|I have|I can)\s.+?\?").unwrap());

static OPTION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Da-d])[\)\.]\s*\S").unwrap());

static OPTION_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[A-Da-d][\)\.]\s*").unwrap());

/// Successfully extracted sections, each trimmed and non-empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extracted {
  fields: BTreeMap<Section, String>,
}

impl Extracted {
  pub fn get(&self, section: Section) -> Option<&str> {
    self.fields.get(&section).map(String::as_str)
  }

  fn take(&mut self, section: Section) -> String {
    self.fields.remove(&section).unwrap_or_default()
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RiddleContent {
  pub riddle: String,
  pub hint: String,
  pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuizContent {
  pub question: String,
  /// Raw option lines, each keeping its `A)`..`D)` marker.
  pub options: Vec<String>,
  pub hint: String,
  pub answer: String,
}

/// Remove emphasis markup that models like to wrap labels in (`**HINT:**`).
pub fn strip_emphasis(raw: &str) -> String {
  raw.replace('*', "")
}

/// Run the extraction pipeline for `layout` over `raw`.
pub fn extract(raw: &str, layout: Layout) -> Result<Extracted, ParseFailure> {
  let text = strip_emphasis(raw);
  let mut out = Extracted::default();
  let mut missing = Vec::new();

  for &section in layout.sections {
    let found = labelled_section(&text, section).or_else(|| fallback_section(&text, section));
    match found.map(|s| refine(section, s)) {
      Some(value) if !value.is_empty() => {
        out.fields.insert(section, value);
      }
      _ => missing.push(section),
    }
  }

  if missing.is_empty() {
    Ok(out)
  } else {
    Err(ParseFailure { raw: raw.to_string(), missing })
  }
}

pub fn parse_riddle(raw: &str) -> Result<RiddleContent, ParseFailure> {
  let mut ex = extract(raw, RIDDLE_LAYOUT)?;
  Ok(RiddleContent {
    riddle: ex.take(Section::Riddle),
    hint: ex.take(Section::Hint),
    answer: ex.take(Section::Answer),
  })
}

pub fn parse_quiz(raw: &str) -> Result<QuizContent, ParseFailure> {
  let mut ex = extract(raw, QUIZ_LAYOUT)?;
  let options = ex.take(Section::Options).lines().map(str::to_string).collect();
  // The answer is a single option letter or line; trailing commentary is dropped.
  let answer = ex.take(Section::Answer).lines().next().unwrap_or_default().trim().to_string();
  Ok(QuizContent {
    question: ex.take(Section::Question),
    options,
    hint: ex.take(Section::Hint),
    answer,
  })
}

/// Option line without its `A)` / `b.` marker: `"B) Proof of Stake"` gives `"Proof of Stake"`.
pub fn option_text(line: &str) -> &str {
  match OPTION_MARKER.find(line) {
    Some(m) => line[m.end()..].trim_end(),
    None => line.trim(),
  }
}

/// Text after the first `LABEL:` up to the next delimiter line or end of text.
/// A label at the start of a line wins over one further inside a line.
fn labelled_section(text: &str, section: Section) -> Option<String> {
  let label = section.label_regex().find(text).or_else(|| section.inline_regex().find(text))?;
  let start = label.end();
  let end = DELIMITER.find_at(text, start).map(|m| m.start()).unwrap_or(text.len());
  Some(text[start..end].trim().to_string())
}

fn fallback_section(text: &str, section: Section) -> Option<String> {
  match section {
    Section::Riddle => RIDDLE_OPENER.find(text).map(|m| m.as_str().trim().to_string()),
    // Bare "A) .." lines without an "Options:" header.
    Section::Options => {
      let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| OPTION_LINE.is_match(l)).collect();
      if lines.is_empty() { None } else { Some(lines.join("\n")) }
    }
    _ => None,
  }
}

/// Section-specific shaping of the raw captured text.
fn refine(section: Section, captured: String) -> String {
  match section {
    // Question text stops where the option block begins.
    Section::Question => captured
      .lines()
      .take_while(|l| !OPTION_LINE.is_match(l.trim()))
      .collect::<Vec<_>>()
      .join("\n")
      .trim()
      .to_string(),
    Section::Options => four_options(&captured).unwrap_or_default(),
    _ => captured,
  }
}

/// Exactly four option lines lettered A, B, C, D in that order.
fn four_options(block: &str) -> Option<String> {
  let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| OPTION_LINE.is_match(l)).collect();
  if lines.len() != 4 {
    return None;
  }
  let in_order = lines
    .iter()
    .zip(['A', 'B', 'C', 'D'])
    .all(|(line, letter)| line.chars().next().map(|c| c.to_ascii_uppercase()) == Some(letter));
  if in_order { Some(lines.join("\n")) } else { None }
}
