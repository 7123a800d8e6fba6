//! OCR capability interfaces
//!
//! Rendering (`PageRenderer`: PDF page -> image) and recognition
//! (`OcrEngine`: image -> text) are separate traits so the pipeline can run
//! against fakes in tests and against system tools in production.
//!
//! ```text
//! scanned PDF ──► PageRenderer ──► page images (scoped temp dir)
//!                                      │
//!                                      ▼
//!                 image file ──►  OcrEngine  ──► text
//! ```
//!
//! Every renderer or engine call holds a permit from a shared
//! [`EnginePermits`] pool, which caps how many external processes run at once
//! no matter how many documents are processed in parallel.

pub mod backends;

use crate::config::OcrConfig;
use crate::error::ExtractionCause;
use parking_lot::{Condvar, Mutex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use backends::{PopplerRenderer, TesseractEngine};

/// Renders PDF pages to image files
pub trait PageRenderer: Send + Sync {
    /// Render every page of `pdf_bytes` into `workdir`. Returns the image
    /// paths in page order; the files live as long as `workdir` does.
    fn render_pages(&self, pdf_bytes: &[u8], workdir: &Path) -> Result<Vec<PathBuf>, ExtractionCause>;

    fn name(&self) -> &str;
}

/// Recognizes the text in one image file
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<String, ExtractionCause>;

    fn name(&self) -> &str;
}

// ===== CONCURRENCY CAP =====

/// Counting semaphore bounding concurrent renderer/OCR invocations
#[derive(Debug)]
pub struct EnginePermits {
    in_use: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

/// Held while an external engine call runs; released on drop, including
/// during unwinding
#[derive(Debug)]
pub struct EnginePermit<'a> {
    permits: &'a EnginePermits,
}

impl EnginePermits {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            in_use: Mutex::new(0),
            released: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Block until a permit is free
    pub fn acquire(&self) -> EnginePermit<'_> {
        let mut in_use = self.in_use.lock();
        while *in_use >= self.capacity {
            self.released.wait(&mut in_use);
        }
        *in_use += 1;
        EnginePermit { permits: self }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        *self.in_use.lock()
    }
}

impl Drop for EnginePermit<'_> {
    fn drop(&mut self) {
        let mut in_use = self.permits.in_use.lock();
        *in_use -= 1;
        self.permits.released.notify_one();
    }
}

// ===== OCR SERVICE =====

/// Renderer + engine behind one permit pool. Shared by the PDF fallback and
/// the image extractor.
pub struct OcrService {
    renderer: Arc<dyn PageRenderer>,
    engine: Arc<dyn OcrEngine>,
    permits: Arc<EnginePermits>,
}

impl OcrService {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        engine: Arc<dyn OcrEngine>,
        permits: Arc<EnginePermits>,
    ) -> Self {
        Self {
            renderer,
            engine,
            permits,
        }
    }

    /// pdftoppm + tesseract, configured from `config`
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(PopplerRenderer::from_config(config)),
            Arc::new(TesseractEngine::from_config(config)),
            Arc::new(EnginePermits::new(config.max_concurrent)),
        )
    }

    pub fn permits(&self) -> &EnginePermits {
        &self.permits
    }

    /// Render every page and recognize each one exactly once, in page order.
    /// Page texts are concatenated without separators. Returns the text and
    /// the number of pages rendered. Rendered images are removed on every
    /// exit path when the scratch directory drops.
    pub fn recognize_pdf(&self, pdf_bytes: &[u8]) -> Result<(String, usize), ExtractionCause> {
        let scratch = tempfile::Builder::new().prefix("qextract-ocr-").tempdir()?;

        let pages = {
            let _permit = self.permits.acquire();
            self.renderer.render_pages(pdf_bytes, scratch.path())?
        };

        if pages.is_empty() {
            return Err(ExtractionCause::Render {
                renderer: self.renderer.name().to_string(),
                message: "renderer produced no page images".to_string(),
            });
        }

        let mut text = String::new();
        for (index, page) in pages.iter().enumerate() {
            let page_text = self.recognize_image(page)?;
            tracing::debug!(page = index + 1, chars = page_text.len(), engine = self.engine.name(), "recognized page");
            text.push_str(&page_text);
        }

        Ok((text, pages.len()))
    }

    /// Recognize a single image file
    pub fn recognize_image(&self, image: &Path) -> Result<String, ExtractionCause> {
        let _permit = self.permits.acquire();
        self.engine.recognize(image)
    }

    /// Recognize image bytes by materializing them into a scoped temp file
    pub fn recognize_image_bytes(&self, name: &str, bytes: &[u8]) -> Result<String, ExtractionCause> {
        let scratch = tempfile::Builder::new().prefix("qextract-img-").tempdir()?;
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("png");
        let image = scratch.path().join(format!("upload.{extension}"));
        fs::write(&image, bytes)?;
        self.recognize_image(&image)
    }
}
