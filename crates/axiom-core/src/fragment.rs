//! Deterministic fragment scoring.
//!
//! A "fragment" is a claim that cannot stand on its own: a truncated
//! sentence, a pronoun-leading clause ripped from its context, a stray
//! headline half. Scoring is rule-based — no model calls — so every node
//! computes the same score for the same text.
//!
//! Signal weights (stable; the auditor's state machine depends on them):
//!
//! | signal                                        | weight |
//! |-----------------------------------------------|--------|
//! | fewer than 4 whitespace tokens                | 0.60   |
//! | otherwise fewer than 8 tokens                 | 0.30   |
//! | no entity-looking token                       | 0.25   |
//! | leading pronoun                               | 0.25   |
//! | final character not `.` `!` `?`               | 0.15   |
//! | first alphabetic character lowercase          | 0.10   |
//!
//! The sum is clamped to [0.0, 1.0].

const PRONOUNS: [&str; 10] = [
  "he", "she", "they", "it", "this", "that", "these", "those", "we", "i",
];

/// The score and the comma-joinable reason tags for a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSignals {
  pub score:   f64,
  pub reasons: Vec<&'static str>,
}

impl FragmentSignals {
  /// The reason tags joined for storage, or `None` when nothing fired.
  pub fn reason_string(&self) -> Option<String> {
    if self.reasons.is_empty() {
      None
    } else {
      Some(self.reasons.join(","))
    }
  }
}

/// A token "looks like" a named entity when it carries a digit anywhere, or
/// starts with an uppercase letter in a non-sentence-initial position.
fn looks_like_entity(token: &str, is_first: bool) -> bool {
  if token.chars().any(|c| c.is_ascii_digit()) {
    return true;
  }
  !is_first && token.chars().next().is_some_and(char::is_uppercase)
}

/// Score `text` for fragment-ness. Empty input is maximally suspicious.
pub fn fragment_signals(text: &str) -> FragmentSignals {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return FragmentSignals { score: 1.0, reasons: vec!["empty"] };
  }

  let tokens: Vec<&str> = trimmed.split_whitespace().collect();
  let mut score: f64 = 0.0;
  let mut reasons = Vec::new();

  if tokens.len() < 4 {
    score += 0.6;
    reasons.push("short_sentence");
  } else if tokens.len() < 8 {
    score += 0.3;
    reasons.push("moderately_short");
  }

  let has_entity = tokens
    .iter()
    .enumerate()
    .any(|(i, t)| looks_like_entity(t, i == 0));
  if !has_entity {
    score += 0.25;
    reasons.push("no_named_entities");
  }

  let first = tokens[0]
    .trim_matches(|c: char| !c.is_alphanumeric())
    .to_ascii_lowercase();
  if PRONOUNS.contains(&first.as_str()) {
    score += 0.25;
    reasons.push("pronoun_start");
  }

  if !trimmed.ends_with(['.', '!', '?']) {
    score += 0.15;
    reasons.push("nonterminal_punctuation");
  }

  if trimmed
    .chars()
    .find(|c| c.is_alphabetic())
    .is_some_and(char::is_lowercase)
  {
    score += 0.1;
    reasons.push("lowercase_start");
  }

  FragmentSignals { score: score.clamp(0.0, 1.0), reasons }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pronoun_leading_stub_scores_high() {
    // Short, pronoun-leading, lowercase, no entities: well past the
    // suspicion threshold.
    let s = fragment_signals("he went there.");
    assert!(s.score >= 0.5, "score was {}", s.score);
    assert!(s.reasons.contains(&"short_sentence"));
    assert!(s.reasons.contains(&"pronoun_start"));
    assert!(s.reasons.contains(&"lowercase_start"));
    assert!(s.reasons.contains(&"no_named_entities"));
    assert!(!s.reasons.contains(&"nonterminal_punctuation"));
  }

  #[test]
  fn full_sentence_with_entities_scores_low() {
    let s = fragment_signals(
      "The European Space Agency launched the Ariane 6 rocket from Kourou \
       in July 2024.",
    );
    assert!(s.score < 0.2, "score was {}", s.score);
    assert_eq!(s.reason_string(), None);
  }

  #[test]
  fn empty_text_is_maximally_suspicious() {
    let s = fragment_signals("   ");
    assert_eq!(s.score, 1.0);
    assert_eq!(s.reason_string().as_deref(), Some("empty"));
  }

  #[test]
  fn digits_count_as_entities() {
    let s = fragment_signals(
      "the index rose 4 percent over the previous quarter.",
    );
    assert!(!s.reasons.contains(&"no_named_entities"));
  }

  #[test]
  fn missing_terminator_is_flagged() {
    let s = fragment_signals("Projections for the Atlantic hurricane");
    assert!(s.reasons.contains(&"nonterminal_punctuation"));
  }

  #[test]
  fn moderately_short_weighs_less_than_very_short() {
    let short = fragment_signals("Rates fell.");
    let moderate = fragment_signals("Rates fell across all three markets.");
    assert!(short.score > moderate.score);
  }

  #[test]
  fn score_never_exceeds_one() {
    let s = fragment_signals("it");
    assert!(s.score <= 1.0);
  }
}
