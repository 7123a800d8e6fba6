use super::{BlockStrategy, StrategyKind};
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

static DEFAULT_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bQ\d+[.:)]?").unwrap());

/// Numbered question blocks: each `Q<digits>` marker (optionally followed by
/// `.`, `:` or `)`) opens a block that runs to the next marker or the end of
/// the text. The marker itself is not part of the block, and text before the
/// first marker is ignored.
#[derive(Debug, Clone)]
pub struct MarkerStrategy {
    marker: Regex,
}

impl Default for MarkerStrategy {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER_REGEX.clone(),
        }
    }
}

impl MarkerStrategy {
    pub fn new(pattern: &str) -> Result<Self> {
        let marker =
            Regex::new(pattern).with_context(|| format!("Invalid question marker pattern '{pattern}'"))?;
        Ok(Self { marker })
    }
}

impl BlockStrategy for MarkerStrategy {
    fn blocks<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let markers: Vec<(usize, usize)> = self
            .marker
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();

        markers
            .iter()
            .enumerate()
            .map(|(i, &(_, body_start))| {
                let body_end = markers.get(i + 1).map_or(text.len(), |&(next_start, _)| next_start);
                &text[body_start..body_end]
            })
            .collect()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Marker
    }

    fn allows_choices(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_exclude_marker_and_preamble() {
        let blocks = MarkerStrategy::default().blocks("Physics quiz Q1. Define work. Q2) Define power. Q10: Units?");
        assert_eq!(blocks, vec![" Define work. ", " Define power. ", " Units?"]);
    }

    #[test]
    fn test_marker_needs_word_boundary_and_digits() {
        let strategy = MarkerStrategy::default();
        assert!(strategy.blocks("FAQ1 is not a marker, nor is Q.").is_empty());
        assert_eq!(strategy.blocks("Q7 Name a prime").len(), 1);
    }

    #[test]
    fn test_custom_pattern() {
        let strategy = MarkerStrategy::new(r"\bQuestion \d+[.:)]?").unwrap();
        assert_eq!(
            strategy.blocks("Question 1: Why? Question 2. How?"),
            vec![" Why? ", " How?"]
        );
        assert!(MarkerStrategy::new("Q(").is_err());
    }
}
