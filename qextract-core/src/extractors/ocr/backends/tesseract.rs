//! OCR via the Tesseract command-line tool

use super::process::run_with_timeout;
use crate::config::OcrConfig;
use crate::error::ExtractionCause;
use crate::extractors::ocr::OcrEngine;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Runs `tesseract <image> stdout -l <language>` and returns what it prints
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            timeout,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.tesseract_path, config.language.clone(), config.timeout())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &Path) -> Result<String, ExtractionCause> {
        let mut command = Command::new(&self.binary);
        command.arg(image).arg("stdout").arg("-l").arg(&self.language);

        let output = run_with_timeout(&mut command, self.timeout).map_err(|failure| {
            failure.into_cause(self.name(), |message| ExtractionCause::Ocr {
                engine: self.name().to_string(),
                message: format!("{}: {message}", image.display()),
            })
        })?;

        // Empty output is a valid answer for a blank page.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
