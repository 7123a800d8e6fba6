use crate::analysis::{AnalysisReport, QuestionType};
use crate::error::ExtractionCause;
use crate::types::*;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

pub const SCHEMA_VERSION: &str = "1.0";

/// Provenance of a processed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub source: String,
    pub kind: DocumentKind,
    pub sha256: String,
    pub byte_len: usize,
    pub extraction_method: ExtractionMethod,
    pub page_count: Option<usize>,
}

impl DocumentInfo {
    pub fn describe(document: &Document, extraction: &Extraction) -> Result<Self, ExtractionCause> {
        let bytes = document.read_bytes()?;
        Ok(Self {
            source: document.display_name(),
            kind: document.kind(),
            sha256: calculate_document_hash(&bytes),
            byte_len: bytes.len(),
            extraction_method: extraction.method,
            page_count: extraction.page_count,
        })
    }
}

/// Hex SHA-256 of the full document contents
pub fn calculate_document_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Full result of one document run, as handed to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReport {
    pub schema_version: String,
    pub document: DocumentInfo,
    pub questions: QuestionBatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlatQuestions {
    pub format: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Complete JSON report
    Report,
    /// Question texts only
    Flat,
    /// Numbered listing for people
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Report | OutputFormat::Flat => "json",
            OutputFormat::Text => "txt",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "report" | "json" => Ok(OutputFormat::Report),
            "flat" => Ok(OutputFormat::Flat),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => bail!("Unknown output format '{other}' (expected report, flat or text)"),
        }
    }
}

impl QuestionReport {
    pub fn new(document: DocumentInfo, questions: QuestionBatch) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            document,
            questions,
            analysis: None,
            processed_at: Utc::now(),
        }
    }

    pub fn with_analysis(mut self, analysis: AnalysisReport) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn to_flat_format(&self) -> FlatQuestions {
        FlatQuestions {
            format: "flat".to_string(),
            questions: self.questions.question_texts(),
        }
    }

    pub fn to_text_format(&self) -> String {
        let labels = self.analysis.as_ref().map(|a| a.labels.as_slice());
        let mut out = String::new();
        let _ = writeln!(out, "{} ({} questions)", self.document.source, self.questions.len());

        for (index, record) in self.questions.iter().enumerate() {
            let label = labels
                .and_then(|l| l.get(index))
                .map(|t| format!(" [{}]", type_label(*t)))
                .unwrap_or_default();
            let _ = writeln!(out, "\n{}.{} {}", index + 1, label, record.question);
            for choice in record.choices.iter().flatten() {
                let _ = writeln!(out, "    {choice}");
            }
        }

        if let Some(analysis) = &self.analysis {
            if !analysis.topics.is_empty() {
                let _ = writeln!(out, "\nTopics:");
                for topic in &analysis.topics {
                    let terms: Vec<&str> = topic.terms.iter().map(|(t, _)| t.as_str()).collect();
                    let _ = writeln!(out, "  {}: {}", topic.id + 1, terms.join(", "));
                }
            }
        }
        out
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Report => serde_json::to_string_pretty(self)?,
            OutputFormat::Flat => serde_json::to_string_pretty(&self.to_flat_format())?,
            OutputFormat::Text => self.to_text_format(),
        })
    }

    pub fn save_with_format(&self, path: &Path, format: OutputFormat) -> Result<()> {
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }
}

fn type_label(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::ShortAnswer => "short answer",
        QuestionType::LongAnswer => "long answer",
        QuestionType::MultipleChoice => "multiple choice",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> QuestionReport {
        let info = DocumentInfo {
            source: "quiz.docx".to_string(),
            kind: DocumentKind::Docx,
            sha256: calculate_document_hash(b"quiz"),
            byte_len: 4,
            extraction_method: ExtractionMethod::Paragraphs,
            page_count: None,
        };
        let batch = QuestionBatch::new(vec![
            QuestionRecord::new("What is 2+2?", vec!["A) 3".to_string(), "B) 4".to_string()]).unwrap(),
            QuestionRecord::new("Explain gravity.", vec![]).unwrap(),
        ]);
        QuestionReport::new(info, batch)
    }

    #[test]
    fn test_report_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_report().render(OutputFormat::Report).unwrap()).unwrap();
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["document"]["kind"], "docx");
        assert_eq!(json["document"]["extraction_method"], "paragraphs");
        assert_eq!(json["questions"][0]["choices"][1], "B) 4");
        assert!(json["questions"][1]["choices"].is_null());
        assert!(json.get("analysis").is_none());
    }

    #[test]
    fn test_flat_and_text_formats() {
        let report = sample_report().with_analysis(AnalysisReport {
            labels: vec![QuestionType::MultipleChoice, QuestionType::LongAnswer],
            topics: vec![],
        });
        let flat: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Flat).unwrap()).unwrap();
        assert_eq!(flat["questions"], serde_json::json!(["What is 2+2?", "Explain gravity."]));

        let text = report.render(OutputFormat::Text).unwrap();
        assert!(text.contains("1. [multiple choice] What is 2+2?\n    A) 3\n    B) 4"));
        assert!(text.contains("2. [long answer] Explain gravity."));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = calculate_document_hash(b"abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("report".parse::<OutputFormat>().unwrap(), OutputFormat::Report);
        assert!("graph".parse::<OutputFormat>().is_err());
    }
}
