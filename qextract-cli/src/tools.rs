//! External tool discovery
//!
//! OCR needs two command-line tools: `pdftoppm` (Poppler) to rasterize scanned
//! PDF pages and `tesseract` to read the images. They are resolved from the
//! configured path, or searched for on `PATH` when the configuration holds a
//! bare name, and checked with a version probe.

use anyhow::{anyhow, Context, Result};
use qextract_core::config::OcrConfig;
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Result of checking one external tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub configured: PathBuf,
    pub resolved: Option<PathBuf>,
    pub version: Option<String>,
    pub error: Option<String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.resolved.is_some() && self.error.is_none()
    }
}

/// Resolves tool executables against a search path
pub struct ToolLocator {
    search_path: Vec<PathBuf>,
}

impl ToolLocator {
    /// Search the directories listed in `PATH`
    pub fn from_env() -> Self {
        let search_path = env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self { search_path }
    }

    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Location of the user config file (e.g. ~/.config/qextract/config.yaml)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qextract").join("config.yaml"))
    }

    /// A configured path with a directory component is used as-is; a bare
    /// name is looked up in each search directory in order.
    pub fn resolve(&self, configured: &Path) -> Option<PathBuf> {
        if configured.is_absolute() || configured.components().count() > 1 {
            return is_executable(configured).then(|| configured.to_path_buf());
        }

        self.search_path.iter().find_map(|dir| {
            candidate_names(configured)
                .into_iter()
                .map(|name| dir.join(name))
                .find(|candidate| is_executable(candidate))
        })
    }

    /// Run `<tool> <version_arg>` and return the first non-empty output line.
    /// Some tools print their version on stderr.
    pub fn probe_version(path: &Path, version_arg: &str) -> Result<String> {
        let output = Command::new(path)
            .arg(version_arg)
            .output()
            .with_context(|| format!("Failed to run {}", path.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{} printed no version information", path.display()))
    }

    pub fn check(&self, name: &str, configured: &Path, version_arg: &str) -> ToolStatus {
        let resolved = self.resolve(configured);
        let (version, error) = match &resolved {
            Some(path) => match Self::probe_version(path, version_arg) {
                Ok(version) => (Some(version), None),
                Err(e) => (None, Some(format!("{e:#}"))),
            },
            None => (
                None,
                Some(format!("'{}' not found", configured.display())),
            ),
        };
        ToolStatus {
            name: name.to_string(),
            configured: configured.to_path_buf(),
            resolved,
            version,
            error,
        }
    }

    /// Check the renderer and OCR engine named in the OCR config
    pub fn check_ocr_tools(&self, config: &OcrConfig) -> Vec<ToolStatus> {
        vec![
            self.check("pdftoppm", &config.pdftoppm_path, "-v"),
            self.check("tesseract", &config.tesseract_path, "--version"),
        ]
    }
}

fn candidate_names(name: &Path) -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        if name.extension().is_none() {
            return vec![name.with_extension("exe"), name.to_path_buf()];
        }
    }
    vec![name.to_path_buf()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_absolute_path() {
        let locator = ToolLocator::with_search_path(vec![]);
        assert!(locator.resolve(Path::new("/nonexistent/bin/tesseract")).is_none());

        let status = locator.check("tesseract", Path::new("tesseract"), "--version");
        assert!(!status.is_available());
        assert!(status.error.unwrap().contains("not found"));
    }

    #[test]
    fn test_default_config_path_location() {
        if let Some(path) = ToolLocator::default_config_path() {
            assert!(path.ends_with("qextract/config.yaml"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_name_searched_in_order() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let not_executable = first.path().join("pdftoppm");
        std::fs::write(&not_executable, "").unwrap();

        let tool = second.path().join("pdftoppm");
        std::fs::write(&tool, "#!/bin/sh\necho 'pdftoppm version 24.02.0' >&2\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let locator = ToolLocator::with_search_path(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(locator.resolve(Path::new("pdftoppm")), Some(tool.clone()));

        let status = locator.check("pdftoppm", Path::new("pdftoppm"), "-v");
        assert!(status.is_available());
        assert_eq!(status.version.as_deref(), Some("pdftoppm version 24.02.0"));
    }
}
