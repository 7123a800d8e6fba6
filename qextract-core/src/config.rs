use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_tesseract_path() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_pdftoppm_path() -> PathBuf {
    PathBuf::from("pdftoppm")
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_render_dpi() -> u32 {
    300
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_concurrent() -> usize {
    2
}

fn default_metadata_patterns() -> Vec<String> {
    vec![
        r"^Answer:\s*Not available.*$".to_string(),
        r"^None:.*$".to_string(),
    ]
}

fn default_marker_pattern() -> String {
    r"\bQ\d+[.:)]?".to_string()
}

fn default_num_topics() -> usize {
    3
}

fn default_terms_per_topic() -> usize {
    5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// External OCR engine and page renderer
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Light-mode metadata stripping
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// Question block and choice detection
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    /// Placeholder analysis stage
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract executable, either a bare name looked up on PATH or a full path
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: PathBuf,
    /// Poppler's pdftoppm executable, used to rasterize scanned PDF pages
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: PathBuf,
    /// Tesseract language code(s), e.g. "eng" or "eng+fra"
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_render_dpi")]
    pub render_dpi: u32,
    /// Wall-clock limit for each renderer/OCR invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of concurrent renderer/OCR invocations per process
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: default_tesseract_path(),
            pdftoppm_path: default_pdftoppm_path(),
            language: default_language(),
            render_dpi: default_render_dpi(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Patterns removed from each line in light mode. A pattern sees a single
    /// line with leading whitespace already trimmed.
    #[serde(default = "default_metadata_patterns")]
    pub metadata_patterns: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            metadata_patterns: default_metadata_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Pattern that opens a question block; the match itself is not part of the stem
    #[serde(default = "default_marker_pattern")]
    pub marker_pattern: String,
    /// Fall back to '?'-terminated sentences when no marker matches
    #[serde(default = "default_true")]
    pub sentence_fallback: bool,
    /// Split choices that share a physical line with the stem or each other
    #[serde(default = "default_true")]
    pub inline_choices: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            marker_pattern: default_marker_pattern(),
            sentence_fallback: true,
            inline_choices: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_num_topics")]
    pub num_topics: usize,
    #[serde(default = "default_terms_per_topic")]
    pub terms_per_topic: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            num_topics: default_num_topics(),
            terms_per_topic: default_terms_per_topic(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate config from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!(path = %p.display(), error = %format!("{e:#}"), "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject settings that would fail later at construction or run time
    pub fn validate(&self) -> Result<()> {
        if self.ocr.max_concurrent == 0 {
            bail!("ocr.max_concurrent must be at least 1");
        }
        if self.ocr.render_dpi == 0 {
            bail!("ocr.render_dpi must be greater than 0");
        }
        if self.ocr.timeout_secs == 0 {
            bail!("ocr.timeout_secs must be greater than 0");
        }
        if self.ocr.language.trim().is_empty() {
            bail!("ocr.language must not be empty");
        }
        for pattern in &self.normalizer.metadata_patterns {
            Regex::new(pattern)
                .with_context(|| format!("Invalid normalizer.metadata_patterns entry '{pattern}'"))?;
        }
        Regex::new(&self.segmenter.marker_pattern).with_context(|| {
            format!(
                "Invalid segmenter.marker_pattern '{}'",
                self.segmenter.marker_pattern
            )
        })?;
        if self.analysis.terms_per_topic == 0 {
            bail!("analysis.terms_per_topic must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ocr.render_dpi, 300);
        assert_eq!(config.ocr.timeout(), Duration::from_secs(120));
        assert_eq!(config.normalizer.metadata_patterns.len(), 2);
        assert!(config.segmenter.sentence_fallback);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "ocr:\n  language: deu\n  max_concurrent: 4\nsegmenter:\n  inline_choices: false\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.max_concurrent, 4);
        assert_eq!(config.ocr.tesseract_path, PathBuf::from("tesseract"));
        assert!(!config.segmenter.inline_choices);
        assert_eq!(config.segmenter.marker_pattern, default_marker_pattern());
        assert_eq!(config.analysis.num_topics, 3);
    }

    #[test]
    fn test_validate_rejects_bad_regex_and_zero_concurrency() {
        let mut config = PipelineConfig::default();
        config.segmenter.marker_pattern = "Q(\\d+".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.ocr.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_and_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ocr:\n  render_dpi: 150").unwrap();
        let config = PipelineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.ocr.render_dpi, 150);

        let missing = PipelineConfig::load_with_fallback(Some(Path::new("/nonexistent/qextract.yaml")));
        assert_eq!(missing.ocr.render_dpi, 300);
    }
}
