// Text normalization
//
// Two independent modes share this module:
// - light: what segmentation consumes. Metadata lines removed, whitespace
//   collapsed, nothing else touched (case and punctuation carry meaning for
//   question markers and choice labels).
// - aggressive: a bag-of-words view for term statistics. Never fed to the
//   segmenter.

use crate::config::NormalizerConfig;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static PAGE_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*page\b").unwrap());

static NON_ALNUM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

static DEFAULT_METADATA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NormalizerConfig::default()
        .metadata_patterns
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningMode {
    Light,
    Aggressive,
}

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    metadata_patterns: Vec<Regex>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            metadata_patterns: DEFAULT_METADATA_PATTERNS.clone(),
        }
    }
}

impl TextNormalizer {
    /// Build a normalizer from line patterns. Each pattern sees one line at a
    /// time with its leading whitespace removed, so `^`/`$` are the line ends.
    pub fn new<S: AsRef<str>>(metadata_patterns: &[S]) -> Result<Self> {
        let metadata_patterns = metadata_patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).with_context(|| format!("Invalid metadata pattern '{p}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { metadata_patterns })
    }

    pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
        Self::new(&config.metadata_patterns)
    }

    pub fn normalize(&self, raw: &str, mode: CleaningMode) -> String {
        match mode {
            CleaningMode::Light => self.light(raw),
            CleaningMode::Aggressive => aggressive(raw),
        }
    }

    /// Light mode. Metadata patterns are line patterns, so they only run
    /// while the text still has its lines: each line is stripped separately
    /// (leading whitespace of any kind removed first) before whitespace is
    /// collapsed. Text already in light form is returned unchanged, which
    /// makes the mode idempotent.
    fn light(&self, raw: &str) -> String {
        if is_light_form(raw) {
            return raw.to_string();
        }

        let mut kept = String::with_capacity(raw.len());
        for line in raw.split(is_line_break) {
            kept.push_str(&self.strip_metadata(line.trim_start()));
            kept.push(' ');
        }
        collapse_whitespace(&kept)
    }

    fn strip_metadata<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut stripped = Cow::Borrowed(line);
        for pattern in &self.metadata_patterns {
            if let Cow::Owned(replaced) = pattern.replace_all(&stripped, "") {
                stripped = Cow::Owned(replaced);
            }
        }
        stripped
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{b}' | '\u{c}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Trimmed, no whitespace other than single spaces
fn is_light_form(text: &str) -> bool {
    let mut previous_space = true;
    for c in text.chars() {
        if c == ' ' {
            if previous_space {
                return false;
            }
            previous_space = true;
        } else if c.is_whitespace() {
            return false;
        } else {
            previous_space = false;
        }
    }
    !text.ends_with(' ')
}

fn aggressive(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let kept: Vec<&str> = lowered
        .lines()
        .filter(|line| !PAGE_LINE_REGEX.is_match(line))
        .collect();
    let joined = kept.join("\n");
    let alphanumeric = NON_ALNUM_REGEX.replace_all(&joined, "");
    collapse_whitespace(&alphanumeric)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_light_strips_metadata_and_collapses() {
        let raw = "Q1. What is 2+2?\nAnswer: Not available\n  A) 3\n\nNone: n/a\nB) 4\n";
        let cleaned = TextNormalizer::default().normalize(raw, CleaningMode::Light);
        assert_eq!(cleaned, "Q1. What is 2+2? A) 3 B) 4");
        assert!(!cleaned.contains('\n'));
    }

    #[test]
    fn test_light_keeps_case_and_punctuation() {
        let cleaned = TextNormalizer::default().normalize("  Why, Sir?!  ", CleaningMode::Light);
        assert_eq!(cleaned, "Why, Sir?!");
    }

    #[test]
    fn test_light_of_whitespace_is_empty() {
        assert_eq!(TextNormalizer::default().normalize(" \n\t\u{c} ", CleaningMode::Light), "");
    }

    #[test]
    fn test_aggressive_drops_page_lines_and_symbols() {
        let raw = "Page 3 of 10\nWhat's the SPEED of light?\n  page footer\nPages matter.";
        let cleaned = TextNormalizer::default().normalize(raw, CleaningMode::Aggressive);
        assert_eq!(cleaned, "whats the speed of light pages matter");
    }

    #[test]
    fn test_custom_patterns() {
        let normalizer = TextNormalizer::new(&[r"^Marks:.*$"]).unwrap();
        assert_eq!(
            normalizer.normalize("Q1. Define force.\nMarks: 5\n", CleaningMode::Light),
            "Q1. Define force."
        );
        assert!(TextNormalizer::new(&["(unclosed"]).is_err());
    }

    #[test]
    fn test_metadata_after_unusual_leading_whitespace() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.normalize("\u{c}None: marks\nQ1. What is 2+2?\nA) 3\nB) 4\n", CleaningMode::Light),
            "Q1. What is 2+2? A) 3 B) 4"
        );
        assert_eq!(
            normalizer.normalize("\u{a0}Answer: Not available\nQ1. Define force.\nQ2. Define work.", CleaningMode::Light),
            "Q1. Define force. Q2. Define work."
        );
        assert_eq!(
            normalizer.normalize("\r\nAnswer: Not available\r\nQ1. Define force.\r\n", CleaningMode::Light),
            "Q1. Define force."
        );
    }

    #[test]
    fn test_form_feed_separates_pages() {
        // OCR output ends every page with a form feed
        let raw = "Q1. Define force.\n\u{c}Answer: Not available\nQ2. Define work.\u{c}None: marks";
        assert_eq!(
            TextNormalizer::default().normalize(raw, CleaningMode::Light),
            "Q1. Define force. Q2. Define work."
        );
    }

    #[test]
    fn test_collapsed_text_is_never_erased() {
        let collapsed = "Answer: Not available Q1. Define force.";
        assert_eq!(
            TextNormalizer::default().normalize(collapsed, CleaningMode::Light),
            collapsed
        );
    }

    proptest! {
        #[test]
        fn light_is_idempotent(raw in "[a-zA-Z0-9 \\n\\t\\r\u{c}\u{a0}:?.)]{0,120}|(Answer: Not available|None: x|Q1\\. Why\\?|\\n|\\r|\u{c}|\u{a0}| ){0,12}") {
            let normalizer = TextNormalizer::default();
            let once = normalizer.normalize(&raw, CleaningMode::Light);
            let twice = normalizer.normalize(&once, CleaningMode::Light);
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains('\n'));
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn questions_survive_metadata_lines(
            lines in proptest::collection::vec(
                ("[ \t\r\u{c}\u{a0}]{0,3}", prop_oneof![
                    Just("Answer: Not available"),
                    Just("None: marks"),
                    Just(""),
                ]),
                1..8,
            ),
        ) {
            let mut raw = String::new();
            let mut expected = Vec::new();
            for (i, (lead, metadata)) in lines.iter().enumerate() {
                let question = format!("Q{}. Define term{}.", i + 1, i + 1);
                raw.push_str(&format!("{lead}{metadata}\n{question}\n"));
                expected.push(question);
            }
            let cleaned = TextNormalizer::default().normalize(&raw, CleaningMode::Light);
            prop_assert_eq!(cleaned, expected.join(" "));
        }
    }
}
