//! Small text helpers shared by the scorer and the quality gate.

/// Lowercased alphabetic word tokens. Digits and punctuation split words.
pub fn words(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphabetic() && c != '\'')
    .map(|w| w.trim_matches('\'').to_lowercase())
    .filter(|w| !w.is_empty())
    .collect()
}

/// Number of whitespace-separated tokens.
pub fn word_count(text: &str) -> usize {
  text.split_whitespace().count()
}

/// True if the lowercased text contains `phrase` as whole words.
pub fn contains_phrase(haystack_lower: &str, phrase: &str) -> bool {
  let needle = phrase.to_lowercase();
  let mut from = 0usize;
  while let Some(found) = haystack_lower[from..].find(&needle) {
    let start = from + found;
    let end = start + needle.len();
    let before_ok = haystack_lower[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
    let after_ok = haystack_lower[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
    if before_ok && after_ok {
      return true;
    }
    from = start + needle.len().max(1);
    if from >= haystack_lower.len() {
      break;
    }
  }
  false
}

/// Map `value` to a score using ascending `(upper_bound, score)` steps.
/// Values above the last bound get `above`.
pub fn step_score(value: f64, steps: &[(f64, f64)], above: f64) -> f64 {
  for (bound, score) in steps {
    if value <= *bound {
      return *score;
    }
  }
  above
}

/// Log-safe truncation for large strings.
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn words_are_lowercased_and_split_on_punctuation() {
    assert_eq!(words("Article 21, Right-to-Life!"), vec!["article", "right", "to", "life"]);
  }

  #[test]
  fn phrase_match_respects_word_boundaries() {
    let text = "consider the following statements about it";
    assert!(contains_phrase(text, "Consider the following"));
    assert!(contains_phrase(text, "it"));
    assert!(!contains_phrase("italy and its rivers", "it"));
  }

  #[test]
  fn step_score_picks_first_matching_bound() {
    let steps = [(1.0, 20.0), (2.0, 40.0)];
    assert_eq!(step_score(0.0, &steps, 100.0), 20.0);
    assert_eq!(step_score(2.0, &steps, 100.0), 40.0);
    assert_eq!(step_score(7.0, &steps, 100.0), 100.0);
  }

  #[test]
  fn truncation_keeps_char_boundaries() {
    let s = "ééééé";
    let t = trunc_for_log(s, 3);
    assert!(t.starts_with('é'));
    assert!(t.contains("bytes total"));
  }
}
