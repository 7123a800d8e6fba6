//! PDF extraction
//!
//! The embedded text layer is read page by page. When it holds nothing but
//! whitespace (scanned or image-only PDFs) the pages are rendered and OCR'd
//! instead; this is the only fallback anywhere in extraction.

use crate::error::ExtractionCause;
use crate::extractors::ocr::OcrService;
use crate::extractors::Extractor;
use crate::types::{Document, DocumentKind, Extraction, ExtractionMethod};
use std::sync::Arc;

/// Source of a PDF's embedded text
pub trait PdfTextLayer: Send + Sync {
    /// Text of every page, in page order
    fn page_texts(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionCause>;

    fn name(&self) -> &str;
}

/// Text layer read with `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextLayer;

impl PdfTextLayer for LopdfTextLayer {
    fn page_texts(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionCause> {
        let document = lopdf::Document::load_mem(pdf_bytes).map_err(|e| ExtractionCause::decode("pdf", e))?;

        if document.is_encrypted() {
            return Err(ExtractionCause::decode("pdf", "document is encrypted"));
        }

        // get_pages() is keyed by page number, so iteration is in page order.
        document
            .get_pages()
            .keys()
            .map(|&page| {
                document
                    .extract_text(&[page])
                    .map_err(|e| ExtractionCause::decode("pdf", format!("page {page}: {e}")))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

pub struct PdfExtractor {
    text_layer: Box<dyn PdfTextLayer>,
    ocr: Arc<OcrService>,
}

impl PdfExtractor {
    pub fn new(text_layer: Box<dyn PdfTextLayer>, ocr: Arc<OcrService>) -> Self {
        Self { text_layer, ocr }
    }
}

impl Extractor for PdfExtractor {
    fn extract(&self, document: &Document) -> Result<Extraction, ExtractionCause> {
        let bytes = document.read_bytes()?;
        let pages = self.text_layer.page_texts(&bytes)?;
        let text = pages.concat();

        if !text.trim().is_empty() {
            return Ok(Extraction::new(text, ExtractionMethod::TextLayer, Some(pages.len())));
        }

        tracing::debug!(
            document = %document.display_name(),
            text_layer = self.text_layer.name(),
            pages = pages.len(),
            "text layer empty, rendering pages for OCR"
        );
        let (text, rendered) = self.ocr.recognize_pdf(&bytes)?;
        Ok(Extraction::new(text, ExtractionMethod::OcrFallback, Some(rendered)))
    }

    fn name(&self) -> &str {
        "PdfExtractor"
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }
}
