//! Text Extractors
//!
//! Converts a document into raw text, dispatching on its kind:
//!
//! ```text
//! Document (PDF, DOCX, JPG/PNG)
//!     ↓
//! [Format-specific Extractor]
//!     ├─ PdfExtractor    text layer, OCR fallback when empty
//!     ├─ DocxExtractor   paragraphs, newline-terminated
//!     └─ ImageExtractor  OCR
//!     ↓
//! Extraction (raw text + method)
//! ```
//!
//! Extractors never swallow failures into empty text; every I/O, decode,
//! render or OCR problem is returned as an `ExtractionCause`.

pub mod docx;
pub mod image;
pub mod ocr;
pub mod pdf;

pub use docx::DocxExtractor;
pub use image::ImageExtractor;
pub use ocr::{EnginePermit, EnginePermits, OcrEngine, OcrService, PageRenderer};
pub use pdf::{LopdfTextLayer, PdfExtractor, PdfTextLayer};

use crate::config::OcrConfig;
use crate::error::{ExtractionCause, PipelineError};
use crate::types::{Document, DocumentKind, Extraction};
use std::sync::Arc;

/// Extractor trait - converts one kind of document to raw text
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<Extraction, ExtractionCause>;

    /// Extractor name for debugging/logging
    fn name(&self) -> &str;

    fn supports(&self, kind: DocumentKind) -> bool;
}

/// Dispatches a document to the extractor for its kind
pub struct TextExtractor {
    pdf: Box<dyn Extractor>,
    docx: Box<dyn Extractor>,
    image: Box<dyn Extractor>,
}

impl TextExtractor {
    pub fn new(pdf: Box<dyn Extractor>, docx: Box<dyn Extractor>, image: Box<dyn Extractor>) -> Self {
        Self { pdf, docx, image }
    }

    /// Standard extractors over the given text layer and OCR service. The
    /// PDF fallback and the image extractor share the service, and with it
    /// the concurrency cap.
    pub fn with_ocr(text_layer: Box<dyn PdfTextLayer>, ocr: Arc<OcrService>) -> Self {
        Self::new(
            Box::new(PdfExtractor::new(text_layer, Arc::clone(&ocr))),
            Box::new(DocxExtractor),
            Box::new(ImageExtractor::new(ocr)),
        )
    }

    /// lopdf text layer + pdftoppm/tesseract OCR
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::with_ocr(Box::new(LopdfTextLayer), Arc::new(OcrService::from_config(config)))
    }

    fn extractor_for(&self, kind: DocumentKind) -> &dyn Extractor {
        match kind {
            DocumentKind::Pdf => self.pdf.as_ref(),
            DocumentKind::Docx => self.docx.as_ref(),
            DocumentKind::Image => self.image.as_ref(),
        }
    }

    pub fn extract(&self, document: &Document) -> Result<Extraction, PipelineError> {
        let kind = document.kind();
        let extractor = self.extractor_for(kind);
        if !extractor.supports(kind) {
            return Err(PipelineError::UnsupportedFormat {
                kind: kind.as_str().to_string(),
            });
        }
        tracing::debug!(extractor = extractor.name(), %kind, "dispatching extraction");
        extractor.extract(document).map_err(PipelineError::from)
    }
}
