//! Question analysis collaborator
//!
//! PLACEHOLDER: `KeywordAnalyzer` is a demo model, not a real categorizer.
//! Its labels come from a handful of cue phrases and its "topics" are just the
//! heaviest TF-IDF terms across the batch. Anything that needs real question
//! typing or topic modeling should plug in its own `QuestionAnalyzer`.

use crate::config::AnalysisConfig;
use crate::normalizer::{CleaningMode, TextNormalizer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    ShortAnswer,
    LongAnswer,
    MultipleChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDescriptor {
    pub id: usize,
    /// Terms with their summed TF-IDF weight, heaviest first
    pub terms: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// One label per question, in batch order
    pub labels: Vec<QuestionType>,
    pub topics: Vec<TopicDescriptor>,
}

pub trait QuestionAnalyzer: Send + Sync {
    /// `labels` in the result must be parallel to `questions`
    fn analyze(&self, questions: &[String]) -> Result<AnalysisReport>;

    fn name(&self) -> &str;
}

const MULTIPLE_CHOICE_CUES: &[&str] = &[
    "which of the following",
    "which one",
    "choose",
    "select",
    "true or false",
];

const LONG_ANSWER_CUES: &[&str] = &[
    "derive",
    "explain",
    "describe",
    "discuss",
    "prove",
    "compare",
    "justify",
    "evaluate",
    "essay",
];

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "all", "an", "and", "any", "are", "as", "at", "be",
        "been", "being", "between", "both", "but", "by", "can", "could", "did", "do", "does", "each",
        "following", "for", "from", "give", "had", "has", "have", "how", "if", "in", "into", "is",
        "it", "its", "list", "many", "may", "more", "most", "much", "name", "no", "not", "of", "on",
        "one", "or", "other", "should", "so", "some", "state", "such", "than", "that", "the",
        "their", "them", "then", "there", "these", "they", "this", "those", "to", "two", "under",
        "up", "use", "using", "was", "were", "what", "when", "where", "which", "while", "who",
        "whom", "why", "will", "with", "would", "write", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Placeholder analyzer: cue-phrase labels and TF-IDF term "topics"
pub struct KeywordAnalyzer {
    normalizer: TextNormalizer,
    num_topics: usize,
    terms_per_topic: usize,
}

impl Default for KeywordAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl KeywordAnalyzer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            normalizer: TextNormalizer::default(),
            num_topics: config.num_topics,
            terms_per_topic: config.terms_per_topic.max(1),
        }
    }

    pub fn label(&self, question: &str) -> QuestionType {
        let lowered = question.to_lowercase();
        if MULTIPLE_CHOICE_CUES.iter().any(|cue| lowered.contains(cue)) {
            QuestionType::MultipleChoice
        } else if lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| LONG_ANSWER_CUES.contains(&word))
        {
            QuestionType::LongAnswer
        } else {
            QuestionType::ShortAnswer
        }
    }

    fn tokens(&self, question: &str) -> Vec<String> {
        self.normalizer
            .normalize(question, CleaningMode::Aggressive)
            .split(' ')
            .filter(|t| t.len() > 2 && !STOP_WORDS.contains(*t) && !t.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect()
    }

    /// Summed smoothed TF-IDF per term, heaviest first (ties alphabetical)
    fn ranked_terms(&self, questions: &[String]) -> Vec<(String, f64)> {
        let docs: Vec<Vec<String>> = questions.iter().map(|q| self.tokens(q)).collect();
        let n = docs.len() as f64;

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &docs {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let mut weights: BTreeMap<&str, f64> = BTreeMap::new();
        for doc in docs.iter().filter(|d| !d.is_empty()) {
            let len = doc.len() as f64;
            for term in doc {
                let df = document_frequency[term.as_str()] as f64;
                let idf = ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                *weights.entry(term.as_str()).or_default() += idf / len;
            }
        }

        let mut ranked: Vec<(String, f64)> = weights
            .into_iter()
            .map(|(term, weight)| (term.to_string(), weight))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

impl QuestionAnalyzer for KeywordAnalyzer {
    fn analyze(&self, questions: &[String]) -> Result<AnalysisReport> {
        let labels = questions.iter().map(|q| self.label(q)).collect();

        let ranked = self.ranked_terms(questions);
        let topics = ranked
            .chunks(self.terms_per_topic)
            .take(self.num_topics)
            .enumerate()
            .map(|(id, terms)| TopicDescriptor {
                id,
                terms: terms.to_vec(),
            })
            .collect();

        Ok(AnalysisReport { labels, topics })
    }

    fn name(&self) -> &str {
        "KeywordAnalyzer"
    }
}
