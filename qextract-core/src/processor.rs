use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::events::{EventSink, PipelineEvent, Stage};
use crate::extractors::TextExtractor;
use crate::normalizer::{CleaningMode, TextNormalizer};
use crate::segmenter::{QuestionSegmenter, Segmentation};
use crate::types::*;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics: lets you inspect/compare each boundary
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStages {
    /// Raw text plus how it was obtained
    pub extraction: Extraction,
    pub cleaned_text: String,
    pub segmentation: Segmentation,
}

impl PipelineStages {
    pub fn raw_text(&self) -> &str {
        &self.extraction.text
    }

    pub fn batch(&self) -> &QuestionBatch {
        &self.segmentation.batch
    }
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        tracing::info!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "step finished");

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            tracing::info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        tracing::info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Pipeline coordinator: extract -> normalize(light) -> segment.
///
/// Holds no per-document state, so one instance can serve parallel calls.
pub struct DocumentProcessor {
    extractor: TextExtractor,
    normalizer: TextNormalizer,
    segmenter: QuestionSegmenter,
    sink: Option<Arc<dyn EventSink>>,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        extractor: TextExtractor,
        normalizer: TextNormalizer,
        segmenter: QuestionSegmenter,
    ) -> Self {
        Self {
            extractor,
            normalizer,
            segmenter,
            sink: None,
        }
    }

    /// System backends (lopdf, pdftoppm, tesseract) wired from config
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new_with_dependencies(
            TextExtractor::from_config(&config.ocr),
            TextNormalizer::from_config(&config.normalizer)?,
            QuestionSegmenter::from_config(&config.segmenter)?,
        ))
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Run the full pipeline. An empty parse is `NoQuestionsFound`; no partial
    /// batch is ever returned alongside a failure.
    pub fn run(&self, document: &Document) -> Result<QuestionBatch, PipelineError> {
        self.run_detailed(document).map(|stages| stages.segmentation.batch)
    }

    /// Like `run`, keeping the intermediate stages for reporting
    pub fn run_detailed(&self, document: &Document) -> Result<PipelineStages, PipelineError> {
        self.run_with_profiling(document, false)
    }

    pub fn run_with_profiling(
        &self,
        document: &Document,
        enable_profiling: bool,
    ) -> Result<PipelineStages, PipelineError> {
        let mut profiler = StepProfiler::new(enable_profiling);
        let result = self.execute(document, &mut profiler, None);
        profiler.log_summary();

        let stages = result?;
        if stages.segmentation.batch.is_empty() {
            self.emit(
                None,
                PipelineEvent::NoQuestionsFound {
                    document: document.display_name(),
                },
            );
            return Err(PipelineError::NoQuestionsFound);
        }
        Ok(stages)
    }

    /// Derive the kind from the path, then run. Unsupported extensions fail
    /// before any extraction work.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<QuestionBatch, PipelineError> {
        let document = Document::from_path(path.as_ref())?;
        self.run(&document)
    }

    /// Diagnostic run that captures every stage. Unlike `run`, an empty
    /// segmentation is returned as-is so it can be inspected. Events go to
    /// `observer` as well as to the configured sink.
    pub fn process_capture_stages(
        &self,
        document: &Document,
        observer: &dyn EventSink,
    ) -> Result<PipelineStages, PipelineError> {
        self.execute(document, &mut StepProfiler::new(false), Some(observer))
    }

    /// Extraction only, for callers that want raw text (e.g. cleaning utilities)
    pub fn extract(&self, document: &Document) -> Result<Extraction, PipelineError> {
        self.extractor.extract(document)
    }

    fn execute(
        &self,
        document: &Document,
        profiler: &mut StepProfiler,
        observer: Option<&dyn EventSink>,
    ) -> Result<PipelineStages, PipelineError> {
        let name = document.display_name();
        self.emit(
            observer,
            PipelineEvent::ExtractionStarted {
                document: name.clone(),
                kind: document.kind(),
            },
        );

        // Stage 1: Extraction (Document → RawText)
        let extraction = match profiler.time_step("1. Extraction", || self.extractor.extract(document)) {
            Ok(extraction) => extraction,
            Err(err) => {
                self.emit(
                    observer,
                    PipelineEvent::StageFailed {
                        stage: Stage::Extract,
                        error_kind: err.kind(),
                        message: err.to_string(),
                    },
                );
                return Err(err);
            }
        };

        if extraction.method == ExtractionMethod::OcrFallback {
            self.emit(
                observer,
                PipelineEvent::ExtractionFallbackToOcr {
                    document: name,
                    pages: extraction.page_count.unwrap_or(0),
                },
            );
        }
        self.emit(
            observer,
            PipelineEvent::TextExtracted {
                method: extraction.method,
                chars: extraction.text.chars().count(),
                pages: extraction.page_count,
            },
        );

        // Stage 2: Normalization (RawText → CleanedText)
        let cleaned_text = profiler.time_step("2. Normalization", || {
            self.normalizer.normalize(&extraction.text, CleaningMode::Light)
        });
        self.emit(
            observer,
            PipelineEvent::TextNormalized {
                raw_chars: extraction.text.chars().count(),
                cleaned_chars: cleaned_text.chars().count(),
            },
        );

        // Stage 3: Segmentation (CleanedText → QuestionBatch)
        let segmentation = profiler.time_step("3. Segmentation", || {
            self.segmenter.segment_detailed(&cleaned_text)
        });
        self.emit(
            observer,
            PipelineEvent::SegmentationCompleted {
                strategy: segmentation.strategy,
                blocks: segmentation.blocks,
                questions: segmentation.batch.len(),
            },
        );

        Ok(PipelineStages {
            extraction,
            cleaned_text,
            segmentation,
        })
    }

    fn emit(&self, observer: Option<&dyn EventSink>, event: PipelineEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(&event);
        }
        if let Some(observer) = observer {
            observer.emit(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_processor_is_shareable() {
        assert_send_sync::<DocumentProcessor>();
    }

    #[test]
    fn test_profiler_records_only_when_enabled() {
        let mut disabled = StepProfiler::new(false);
        assert_eq!(disabled.time_step("a", || 1), 1);
        assert!(disabled.timings().is_empty());

        let mut enabled = StepProfiler::new(true);
        enabled.time_step("a", || ());
        enabled.time_step("b", || ());
        let steps: Vec<&str> = enabled.timings().iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(steps, vec!["a", "b"]);
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.normalizer.metadata_patterns.push("([".to_string());
        assert!(DocumentProcessor::from_config(&config).is_err());
    }
}
