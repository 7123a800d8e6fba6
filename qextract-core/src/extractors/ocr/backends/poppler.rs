//! Page rendering via Poppler's `pdftoppm`

use super::process::run_with_timeout;
use crate::config::OcrConfig;
use crate::error::ExtractionCause;
use crate::extractors::ocr::PageRenderer;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const PAGE_PREFIX: &str = "page";

/// Rasterizes every page of a PDF to PNG with `pdftoppm -png -r <dpi>`
#[derive(Debug, Clone)]
pub struct PopplerRenderer {
    binary: PathBuf,
    dpi: u32,
    timeout: Duration,
}

impl PopplerRenderer {
    pub fn new(binary: impl Into<PathBuf>, dpi: u32, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            dpi,
            timeout,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.pdftoppm_path, config.render_dpi, config.timeout())
    }

    fn failure(&self, message: String) -> ExtractionCause {
        ExtractionCause::Render {
            renderer: self.name().to_string(),
            message,
        }
    }
}

impl PageRenderer for PopplerRenderer {
    fn render_pages(&self, pdf_bytes: &[u8], workdir: &Path) -> Result<Vec<PathBuf>, ExtractionCause> {
        let input = workdir.join("input.pdf");
        fs::write(&input, pdf_bytes)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(workdir.join(PAGE_PREFIX));

        run_with_timeout(&mut command, self.timeout)
            .map_err(|failure| failure.into_cause(self.name(), |message| self.failure(message)))?;

        let pages = collect_page_images(workdir)?;
        tracing::debug!(renderer = self.name(), pages = pages.len(), dpi = self.dpi, "rendered PDF pages");
        Ok(pages)
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}

/// pdftoppm names pages `page-1.png` .. `page-12.png`, or zero-pads them
/// (`page-01.png`) depending on version and page count, so order by the
/// parsed number rather than the filename.
fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, ExtractionCause> {
    let mut pages: Vec<(u32, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != PAGE_PREFIX {
        return None;
    }
    number.parse().ok()
}
