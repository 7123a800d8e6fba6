// Question segmentation
//
// Cleaned text is cut into question blocks by the first strategy (in priority
// order) that finds at least one block; each block is then split into a stem
// and its choice lines. The strategies live in their own files:
// - marker.rs: `Q<digits>` numbered blocks
// - sentence.rs: '?'-terminated sentences, used when no marker is present.
//   A sentence is a single line, so one that opens with a choice label is a
//   choice line with an empty stem and is dropped.
// - choices.rs: stem/choice separation inside a block

pub mod choices;
pub mod marker;
pub mod sentence;

pub use marker::MarkerStrategy;
pub use sentence::SentenceStrategy;

use crate::config::SegmenterConfig;
use crate::types::{QuestionBatch, QuestionRecord};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Marker,
    Sentence,
    /// No strategy found a block
    None,
}

/// A way of cutting cleaned text into question blocks
pub trait BlockStrategy: Send + Sync {
    /// Candidate blocks in text order. Empty when the strategy does not apply.
    fn blocks<'t>(&self, text: &'t str) -> Vec<&'t str>;

    fn kind(&self) -> StrategyKind;

    /// Whether blocks from this strategy may carry choice lines
    fn allows_choices(&self) -> bool;
}

/// Outcome of segmenting one text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub strategy: StrategyKind,
    /// Blocks found by the winning strategy, including ones dropped for an empty stem
    pub blocks: usize,
    pub batch: QuestionBatch,
}

pub struct QuestionSegmenter {
    /// Highest priority first
    strategies: Vec<Box<dyn BlockStrategy>>,
    inline_choices: bool,
}

impl Default for QuestionSegmenter {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(MarkerStrategy::default()),
                Box::new(SentenceStrategy),
            ],
            inline_choices: true,
        }
    }
}

impl QuestionSegmenter {
    pub fn new(strategies: Vec<Box<dyn BlockStrategy>>, inline_choices: bool) -> Self {
        Self {
            strategies,
            inline_choices,
        }
    }

    pub fn from_config(config: &SegmenterConfig) -> Result<Self> {
        let mut strategies: Vec<Box<dyn BlockStrategy>> =
            vec![Box::new(MarkerStrategy::new(&config.marker_pattern)?)];
        if config.sentence_fallback {
            strategies.push(Box::new(SentenceStrategy));
        }
        Ok(Self::new(strategies, config.inline_choices))
    }

    pub fn segment(&self, text: &str) -> QuestionBatch {
        self.segment_detailed(text).batch
    }

    pub fn segment_detailed(&self, text: &str) -> Segmentation {
        for strategy in &self.strategies {
            let blocks = strategy.blocks(text);
            if blocks.is_empty() {
                continue;
            }

            let records: Vec<QuestionRecord> = blocks
                .iter()
                .filter_map(|block| {
                    if strategy.allows_choices() {
                        choices::build_record(block, self.inline_choices)
                    } else if choices::starts_with_label(block.trim_start()) {
                        // a lone choice line has no stem
                        None
                    } else {
                        QuestionRecord::new(block, Vec::new())
                    }
                })
                .collect();

            tracing::debug!(
                strategy = ?strategy.kind(),
                blocks = blocks.len(),
                questions = records.len(),
                "segmented text"
            );

            return Segmentation {
                strategy: strategy.kind(),
                blocks: blocks.len(),
                batch: QuestionBatch::new(records),
            };
        }

        Segmentation {
            strategy: StrategyKind::None,
            blocks: 0,
            batch: QuestionBatch::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(question: &str, choices: Option<&[&str]>) -> QuestionRecord {
        QuestionRecord {
            question: question.to_string(),
            choices: choices.map(|c| c.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_collapsed_multiple_choice_text() {
        let text = "Q1. What is 2+2? A) 3 B) 4 C) 5 Q2. Name the capital of France? A) Paris B) Rome";
        let segmentation = QuestionSegmenter::default().segment_detailed(text);
        assert_eq!(segmentation.strategy, StrategyKind::Marker);
        assert_eq!(
            segmentation.batch.records(),
            &[
                record("What is 2+2?", Some(&["A) 3", "B) 4", "C) 5"])),
                record("Name the capital of France?", Some(&["A) Paris", "B) Rome"])),
            ]
        );
    }

    #[test]
    fn test_sentence_fallback_without_markers() {
        let text = "What is the boiling point of water? It is 100C.";
        let segmentation = QuestionSegmenter::default().segment_detailed(text);
        assert_eq!(segmentation.strategy, StrategyKind::Sentence);
        assert_eq!(
            segmentation.batch.records(),
            &[record("What is the boiling point of water?", None)]
        );
    }

    #[test]
    fn test_fallback_drops_choice_sentences() {
        let text = "Which city is the capital of Italy?\nA) Paris or Rome?\nB) Milan?";
        let segmentation = QuestionSegmenter::default().segment_detailed(text);
        assert_eq!(segmentation.strategy, StrategyKind::Sentence);
        assert_eq!(segmentation.blocks, 3);
        assert_eq!(
            segmentation.batch.records(),
            &[record("Which city is the capital of Italy?", None)]
        );
    }

    #[test]
    fn test_multiline_block_with_choice_lines() {
        let text = "Q1: Which gas do plants absorb\nfrom the air?\nA. Oxygen\nB. Carbon dioxide\nQ2) Define osmosis.";
        let batch = QuestionSegmenter::default().segment(text);
        assert_eq!(
            batch.records(),
            &[
                record(
                    "Which gas do plants absorb from the air?",
                    Some(&["A. Oxygen", "B. Carbon dioxide"])
                ),
                record("Define osmosis.", None),
            ]
        );
    }

    #[test]
    fn test_empty_stem_blocks_are_dropped() {
        let text = "Q1. A) yes B) no Q2. Is water wet?";
        let segmentation = QuestionSegmenter::default().segment_detailed(text);
        assert_eq!(segmentation.blocks, 2);
        assert_eq!(segmentation.batch.records(), &[record("Is water wet?", None)]);
    }

    #[test]
    fn test_markers_win_even_if_every_block_is_dropped() {
        let segmentation = QuestionSegmenter::default().segment_detailed("Why? Q1. Q2.");
        assert_eq!(segmentation.strategy, StrategyKind::Marker);
        assert!(segmentation.batch.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let batch = QuestionSegmenter::default().segment("Q1. Why? Q2. Why? Q3. How?");
        let questions = batch.question_texts();
        assert_eq!(questions, vec!["Why?", "Why?", "How?"]);
    }

    #[test]
    fn test_nothing_to_segment() {
        let segmentation = QuestionSegmenter::default().segment_detailed("");
        assert_eq!(segmentation.strategy, StrategyKind::None);
        assert!(segmentation.batch.is_empty());

        let no_questions = QuestionSegmenter::default().segment("The end. Thank you.");
        assert!(no_questions.is_empty());
    }

    #[test]
    fn test_fallback_disabled_by_config() {
        let config = SegmenterConfig {
            sentence_fallback: false,
            ..SegmenterConfig::default()
        };
        let segmenter = QuestionSegmenter::from_config(&config).unwrap();
        assert!(segmenter.segment("What is love?").is_empty());
    }

    proptest! {
        #[test]
        fn questions_are_never_empty(text in "(Q[0-9]\\. |A\\) |B\\) |[a-z]{1,6} |\\? |\\n){0,30}") {
            let batch = QuestionSegmenter::default().segment(&text);
            for record in &batch {
                prop_assert!(!record.question.is_empty());
                prop_assert_eq!(record.question.trim(), record.question.as_str());
                if let Some(choices) = &record.choices {
                    prop_assert!(!choices.is_empty());
                }
            }
        }

        #[test]
        fn fallback_questions_end_with_question_mark(text in "([a-z]{1,6} |[a-z]{1,6}\\? |\\. |\\n){1,30}") {
            let segmentation = QuestionSegmenter::default().segment_detailed(&text);
            prop_assert_ne!(segmentation.strategy, StrategyKind::Marker);
            for record in &segmentation.batch {
                prop_assert!(record.question.ends_with('?'));
                prop_assert!(record.choices.is_none());
            }
        }

        #[test]
        fn choices_are_not_repeated_in_stem(
            stem in "[a-z]{1,8}( [a-z]{1,8}){0,4}\\?",
            options in proptest::collection::vec("[a-z0-9]{1,8}", 2..6),
        ) {
            let labels = ['A', 'B', 'C', 'D', 'E'];
            let choices: Vec<String> = options
                .iter()
                .zip(labels)
                .map(|(text, label)| format!("{label}) {text}"))
                .collect();
            let text = format!("Q1. {stem} {}", choices.join(" "));
            let batch = QuestionSegmenter::default().segment(&text);
            prop_assert_eq!(batch.len(), 1);
            let record = &batch.records()[0];
            prop_assert_eq!(&record.question, &stem);
            prop_assert_eq!(record.choices.as_ref(), Some(&choices));
        }
    }
}
