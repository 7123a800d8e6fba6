use crate::error::ExtractionCause;
use crate::extractors::ocr::OcrService;
use crate::extractors::Extractor;
use crate::types::{Document, DocumentKind, DocumentSource, Extraction, ExtractionMethod};
use std::sync::Arc;

/// JPEG/PNG uploads go straight to OCR; there is nothing to fall back from.
pub struct ImageExtractor {
    ocr: Arc<OcrService>,
}

impl ImageExtractor {
    pub fn new(ocr: Arc<OcrService>) -> Self {
        Self { ocr }
    }
}

impl Extractor for ImageExtractor {
    fn extract(&self, document: &Document) -> Result<Extraction, ExtractionCause> {
        let text = match document.source() {
            DocumentSource::File(path) => {
                // Surface an unreadable upload as I/O, not as an engine failure.
                std::fs::File::open(path)?;
                self.ocr.recognize_image(path)?
            }
            DocumentSource::Memory { name, bytes } => self.ocr.recognize_image_bytes(name, bytes)?,
        };
        Ok(Extraction::new(text, ExtractionMethod::Ocr, None))
    }

    fn name(&self) -> &str {
        "ImageExtractor"
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Image
    }
}
