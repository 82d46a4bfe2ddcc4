//! Persisted user settings.
//!
//! A small JSON file at `<config_dir>/expapyrus/settings.json` remembering
//! defaults between runs: DPI, languages, whether to auto-save, where output
//! goes, engine locations, and the recently processed documents.
//!
//! Every field has a default, so a partial or older file still loads. A file
//! that does not parse is replaced by defaults rather than blocking the run;
//! [`Settings::try_load`] reports it so callers can avoid writing over it.

use crate::config::{EngineConfig, LanguageSet};
use crate::error::ExtractError;
use crate::output::DEFAULT_DPI;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum number of entries kept in [`Settings::recent_files`].
pub const MAX_RECENT_FILES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_languages: LanguageSet,
    pub default_dpi: u32,
    /// Write the output file after each run instead of printing the text.
    pub auto_save: bool,
    pub timestamped_output: bool,
    pub output_directory: Option<PathBuf>,
    /// Directory of the most recently processed document.
    pub last_directory: Option<PathBuf>,
    /// Most recent first, no duplicates, at most [`MAX_RECENT_FILES`].
    pub recent_files: Vec<PathBuf>,
    pub tesseract_cmd: Option<PathBuf>,
    pub tessdata_dir: Option<PathBuf>,
    pub pdftoppm_cmd: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_languages: LanguageSet::default(),
            default_dpi: DEFAULT_DPI,
            auto_save: true,
            timestamped_output: false,
            output_directory: None,
            last_directory: None,
            recent_files: Vec::new(),
            tesseract_cmd: None,
            tessdata_dir: None,
            pdftoppm_cmd: None,
        }
    }
}

impl Settings {
    /// Platform settings path: `<config_dir>/expapyrus/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("expapyrus").join("settings.json"))
    }

    /// Load settings from `path`. A missing file yields defaults; so does a
    /// corrupt one, with a warning. Use [`Settings::try_load`] to tell the
    /// two apart.
    pub fn load(path: &Path) -> Self {
        Self::try_load(path).unwrap_or_else(|e| {
            warn!("Ignoring settings: {}", e);
            Self::default()
        })
    }

    /// Load settings from `path`, failing on an unreadable or corrupt file.
    /// A missing file is not an error and yields defaults.
    pub fn try_load(path: &Path) -> Result<Self, ExtractError> {
        let failed = |detail: String| ExtractError::Settings {
            path: path.to_path_buf(),
            detail,
        };
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(failed(e.to_string())),
        };
        serde_json::from_str(&content).map_err(|e| failed(format!("not valid settings JSON: {e}")))
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        let failed = |detail: String| ExtractError::Settings {
            path: path.to_path_buf(),
            detail,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| failed(e.to_string()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Record `document` as the most recently processed file.
    pub fn add_recent(&mut self, document: &Path) {
        let document = document.to_path_buf();
        self.recent_files.retain(|p| p != &document);
        self.recent_files.insert(0, document.clone());
        self.recent_files.truncate(MAX_RECENT_FILES);
        self.last_directory = document.parent().map(Path::to_path_buf);
    }

    /// Engine locations, falling back to [`EngineConfig::default`] per field.
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            tesseract_cmd: self.tesseract_cmd.clone().unwrap_or(defaults.tesseract_cmd),
            tessdata_dir: self.tessdata_dir.clone().or(defaults.tessdata_dir),
            pdftoppm_cmd: self.pdftoppm_cmd.clone().unwrap_or(defaults.pdftoppm_cmd),
        }
    }
}
