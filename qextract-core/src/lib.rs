// qextract Core Library
//
// Turns an uploaded exam document (PDF, DOCX or image) into an ordered list of
// question records. Main interface is `DocumentProcessor`, which sequences
// extraction -> normalization -> segmentation.

pub mod analysis;
pub mod config;
pub mod error;
pub mod events;
pub mod extractors;
pub mod normalizer;
pub mod output;
pub mod processor;
pub mod segmenter;
pub mod types;

// Re-export main types and functions for easy use
pub use analysis::{AnalysisReport, KeywordAnalyzer, QuestionAnalyzer, QuestionType, TopicDescriptor};
pub use config::PipelineConfig;
pub use error::{ExtractionCause, PipelineError};
pub use events::{EventSink, MemorySink, PipelineEvent, TracingSink};
pub use extractors::{
    EnginePermits, Extractor, OcrEngine, OcrService, PageRenderer, PdfTextLayer, TextExtractor,
};
pub use normalizer::{CleaningMode, TextNormalizer};
pub use output::{DocumentInfo, OutputFormat, QuestionReport};
pub use processor::{DocumentProcessor, PipelineStages};
pub use segmenter::{QuestionSegmenter, Segmentation, StrategyKind};
pub use types::*;
