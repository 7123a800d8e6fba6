//! Pipeline error taxonomy
//!
//! Every failure of a pipeline run is one of three terminal kinds. None of them
//! is retried by the core; retry policy belongs to the caller.

use std::time::Duration;
use thiserror::Error;

/// Why text extraction failed
#[derive(Debug, Error)]
pub enum ExtractionCause {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode {format} content: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    #[error("OCR engine '{engine}' failed: {message}")]
    Ocr { engine: String, message: String },

    #[error("page renderer '{renderer}' failed: {message}")]
    Render { renderer: String, message: String },

    #[error("'{tool}' did not finish within {}s", .after.as_secs_f64())]
    Timeout { tool: String, after: Duration },

    #[error("external tool '{tool}' could not be started: {message}")]
    ToolMissing { tool: String, message: String },
}

impl ExtractionCause {
    pub fn decode(format: &'static str, message: impl ToString) -> Self {
        ExtractionCause::Decode {
            format,
            message: message.to_string(),
        }
    }
}

/// Terminal outcome of a failed pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported document format '{kind}'")]
    UnsupportedFormat { kind: String },

    #[error("text extraction failed: {cause}")]
    ExtractionFailed {
        #[source]
        cause: ExtractionCause,
    },

    #[error("no questions found in document")]
    NoQuestionsFound,
}

impl From<ExtractionCause> for PipelineError {
    fn from(cause: ExtractionCause) -> Self {
        PipelineError::ExtractionFailed { cause }
    }
}

impl PipelineError {
    /// Stable tag for logs and structured output
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat { .. } => "unsupported_format",
            PipelineError::ExtractionFailed { .. } => "extraction_failed",
            PipelineError::NoQuestionsFound => "no_questions_found",
        }
    }

    /// Message suitable for showing to the person who uploaded the document.
    /// Cause details are left to the logs.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::UnsupportedFormat { kind } if kind.is_empty() => {
                "The uploaded file has no extension. Only PDF, DOCX, JPG/JPEG and PNG files are supported."
                    .to_string()
            }
            PipelineError::UnsupportedFormat { kind } => format!(
                "Files of type '.{kind}' are not supported. Only PDF, DOCX, JPG/JPEG and PNG files are supported."
            ),
            PipelineError::ExtractionFailed { cause } => match cause {
                ExtractionCause::Timeout { .. } => {
                    "Reading the document took too long. Try a smaller or clearer file.".to_string()
                }
                ExtractionCause::ToolMissing { .. } => {
                    "Text recognition is not available right now. Please try again later.".to_string()
                }
                _ => "The document could not be read. It may be damaged, password-protected, or an unreadable scan."
                    .to_string(),
            },
            PipelineError::NoQuestionsFound => {
                "No questions were found in the uploaded file.".to_string()
            }
        }
    }
}
