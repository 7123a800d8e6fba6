use crate::error::{ExtractionCause, PipelineError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

// ===== DOCUMENT TYPES =====
// A Document is owned by the caller and never mutated or persisted by the
// pipeline. Its kind is fixed when it is created, so an unsupported extension
// is rejected before any extraction work starts.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
}

impl DocumentKind {
    /// Map a filename extension (with or without the leading dot, any case)
    /// to a supported kind.
    pub fn from_extension(extension: &str) -> Result<Self, PipelineError> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "jpg" | "jpeg" | "png" => Ok(Self::Image),
            _ => Err(PipelineError::UnsupportedFormat { kind: extension }),
        }
    }

    /// Derive the kind from a path's extension. A path without an extension
    /// is rejected with an empty kind.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy())
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the document's bytes live
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// An already-persisted file (the usual case for uploads)
    File(PathBuf),
    /// Bytes held in memory, with the original filename for diagnostics
    Memory { name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct Document {
    kind: DocumentKind,
    source: DocumentSource,
}

impl Document {
    /// Create a document from a file path, deriving the kind from its extension
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let kind = DocumentKind::from_path(&path)?;
        Ok(Self {
            kind,
            source: DocumentSource::File(path),
        })
    }

    /// Create a document from in-memory bytes with an explicitly declared kind
    pub fn from_bytes(kind: DocumentKind, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            source: DocumentSource::Memory {
                name: name.into(),
                bytes,
            },
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    /// Path on disk, if the document is file-backed
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            DocumentSource::File(path) => Some(path),
            DocumentSource::Memory { .. } => None,
        }
    }

    /// Human-readable name used in logs and reports
    pub fn display_name(&self) -> String {
        match &self.source {
            DocumentSource::File(path) => path.display().to_string(),
            DocumentSource::Memory { name, .. } => name.clone(),
        }
    }

    /// Read the full document contents. File-backed documents are read on
    /// every call; in-memory documents are borrowed.
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>, ExtractionCause> {
        match &self.source {
            DocumentSource::File(path) => Ok(Cow::Owned(std::fs::read(path)?)),
            DocumentSource::Memory { bytes, .. } => Ok(Cow::Borrowed(bytes)),
        }
    }
}

// ===== EXTRACTION TYPES =====

/// How the raw text of a document was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Direct PDF text layer
    TextLayer,
    /// DOCX paragraphs
    Paragraphs,
    /// PDF pages rendered and recognized after the text layer came back empty
    OcrFallback,
    /// Image recognized directly
    Ocr,
}

/// Raw extraction output. `text` is unmodified and may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
    /// Page count for paged formats (PDF), `None` otherwise
    pub page_count: Option<usize>,
}

impl Extraction {
    pub fn new(text: String, method: ExtractionMethod, page_count: Option<usize>) -> Self {
        Self {
            text,
            method,
            page_count,
        }
    }
}

// ===== QUESTION TYPES =====

/// One question found in the document. `question` is never empty; `choices`
/// is `None` when no choice lines were recognized, never `Some(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub choices: Option<Vec<String>>,
}

impl QuestionRecord {
    /// Build a record from a stem and its choices. Returns `None` when the
    /// trimmed stem is empty.
    pub fn new(question: &str, choices: Vec<String>) -> Option<Self> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        Some(Self {
            question: question.to_string(),
            choices: if choices.is_empty() { None } else { Some(choices) },
        })
    }

    pub fn has_choices(&self) -> bool {
        self.choices.is_some()
    }
}

/// Ordered question records in the order they appear in the cleaned text.
/// Consumers (analysis, rendering) rely on this order positionally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBatch {
    records: Vec<QuestionRecord>,
}

impl QuestionBatch {
    pub fn new(records: Vec<QuestionRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuestionRecord> {
        self.records.iter()
    }

    /// Question texts in batch order, as fed to the analysis collaborator
    pub fn question_texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.question.clone()).collect()
    }

    pub fn into_records(self) -> Vec<QuestionRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a QuestionBatch {
    type Item = &'a QuestionRecord;
    type IntoIter = std::slice::Iter<'a, QuestionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert_eq!(DocumentKind::from_extension("pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_extension(".DOCX").unwrap(), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_extension("jpg").unwrap(), DocumentKind::Image);
        assert_eq!(DocumentKind::from_extension("JPEG").unwrap(), DocumentKind::Image);
        assert_eq!(DocumentKind::from_extension("png").unwrap(), DocumentKind::Image);
    }

    #[test]
    fn test_unsupported_extension_reports_kind() {
        match DocumentKind::from_path(Path::new("notes/exam.TXT")) {
            Err(PipelineError::UnsupportedFormat { kind }) => assert_eq!(kind, "txt"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_extension_reports_empty_kind() {
        match Document::from_path("uploads/README") {
            Err(PipelineError::UnsupportedFormat { kind }) => assert!(kind.is_empty()),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_memory_document_borrows_bytes() {
        let doc = Document::from_bytes(DocumentKind::Pdf, "upload.pdf", b"%PDF-1.4".to_vec());
        assert_eq!(doc.display_name(), "upload.pdf");
        assert!(doc.path().is_none());
        assert!(matches!(doc.read_bytes().unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_record_without_choices_is_absent_not_empty() {
        let record = QuestionRecord::new("  What is 2+2? ", vec![]).unwrap();
        assert_eq!(record.question, "What is 2+2?");
        assert_eq!(record.choices, None);
        assert!(QuestionRecord::new("   ", vec!["A) 3".to_string()]).is_none());
    }
}
