//! System OCR backends
//!
//! Both shell out to command-line tools through the timeout-enforcing runner
//! in `process`, so a stuck tool surfaces as a `Timeout` cause rather than a
//! hung pipeline.

mod process;

pub mod poppler;
pub mod tesseract;

pub use poppler::PopplerRenderer;
pub use tesseract::TesseractEngine;
