//! Structured pipeline events
//!
//! The coordinator reports what it does through an injected [`EventSink`]
//! instead of configuring a logger itself. Hosts pick the sink: `TracingSink`
//! for ordinary logging, `MemorySink` for tests and stage dumps.

use crate::segmenter::StrategyKind;
use crate::types::{DocumentKind, ExtractionMethod};
use parking_lot::Mutex;
use serde::Serialize;

/// Pipeline stage named in failure events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Normalize,
    Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    ExtractionStarted {
        document: String,
        kind: DocumentKind,
    },
    ExtractionFallbackToOcr {
        document: String,
        pages: usize,
    },
    TextExtracted {
        method: ExtractionMethod,
        chars: usize,
        pages: Option<usize>,
    },
    TextNormalized {
        raw_chars: usize,
        cleaned_chars: usize,
    },
    SegmentationCompleted {
        strategy: StrategyKind,
        blocks: usize,
        questions: usize,
    },
    NoQuestionsFound {
        document: String,
    },
    StageFailed {
        stage: Stage,
        error_kind: &'static str,
        message: String,
    },
}

impl PipelineEvent {
    /// Event tag, identical to the serialized `event` field
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::ExtractionStarted { .. } => "extraction_started",
            PipelineEvent::ExtractionFallbackToOcr { .. } => "extraction_fallback_to_ocr",
            PipelineEvent::TextExtracted { .. } => "text_extracted",
            PipelineEvent::TextNormalized { .. } => "text_normalized",
            PipelineEvent::SegmentationCompleted { .. } => "segmentation_completed",
            PipelineEvent::NoQuestionsFound { .. } => "no_questions_found",
            PipelineEvent::StageFailed { .. } => "stage_failed",
        }
    }
}

/// Receiver for pipeline events. Implementations must tolerate concurrent
/// calls from parallel pipeline runs.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        let name = event.name();
        match event {
            PipelineEvent::ExtractionStarted { document, kind } => {
                tracing::info!(event = name, %document, %kind, "extraction started");
            }
            PipelineEvent::ExtractionFallbackToOcr { document, pages } => {
                tracing::info!(event = name, %document, pages, "text layer empty, falling back to OCR");
            }
            PipelineEvent::TextExtracted {
                method,
                chars,
                pages,
            } => {
                tracing::info!(event = name, ?method, chars, ?pages, "text extracted");
            }
            PipelineEvent::TextNormalized {
                raw_chars,
                cleaned_chars,
            } => {
                tracing::debug!(event = name, raw_chars, cleaned_chars, "text normalized");
            }
            PipelineEvent::SegmentationCompleted {
                strategy,
                blocks,
                questions,
            } => {
                tracing::info!(event = name, ?strategy, blocks, questions, "segmentation completed");
            }
            PipelineEvent::NoQuestionsFound { document } => {
                tracing::warn!(event = name, %document, "no questions found");
            }
            PipelineEvent::StageFailed {
                stage,
                error_kind,
                message,
            } => {
                tracing::warn!(event = name, ?stage, error_kind, %message, "pipeline stage failed");
            }
        }
    }
}

/// Records every event in order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(PipelineEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.lock().push(event.clone());
    }
}
