//! Configuration types for PDF text extraction.
//!
//! Run behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Where the external engines live is described
//! separately by [`EngineConfig`], which [`crate::convert::Extractor::new`]
//! validates before any document is touched.

use crate::error::ExtractError;
use crate::output::{DEFAULT_DPI, DEFAULT_LANGUAGES, DEFAULT_OUTPUT_SUFFIX};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use expapyrus::{ExtractionConfig, LanguageSet};
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .languages("eng+spa".parse::<LanguageSet>().unwrap())
///     .timestamped_output(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.languages.to_string(), "eng+spa");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Default: 300.
    ///
    /// Handwriting needs more pixels than print; 300 DPI is what Tesseract's
    /// models were trained at. Lower values trade accuracy for speed.
    pub dpi: u32,

    /// Languages handed to the OCR engine, in priority order.
    /// Default: `eng+spa+cat`.
    pub languages: LanguageSet,

    /// Where and how the aggregated text is written.
    pub output: OutputOptions,

    /// Formatter behaviour for recognised text. Default: [`FormatMode::Collapse`].
    pub format_mode: FormatMode,

    /// Parent directory for the per-run scratch directory.
    /// Default: the system temporary directory.
    pub scratch_dir: Option<PathBuf>,

    /// Observer notified as pages are recognised.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            languages: LanguageSet::default(),
            output: OutputOptions::default(),
            format_mode: FormatMode::default(),
            scratch_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("languages", &self.languages)
            .field("output", &self.output)
            .field("format_mode", &self.format_mode)
            .field("scratch_dir", &self.scratch_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn languages(mut self, languages: LanguageSet) -> Self {
        self.config.languages = languages;
        self
    }

    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.output.suffix = suffix.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.directory = Some(dir.into());
        self
    }

    pub fn timestamped_output(mut self, v: bool) -> Self {
        self.config.output.timestamped = v;
        self
    }

    pub fn format_mode(mut self, mode: FormatMode) -> Self {
        self.config.format_mode = mode;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi == 0 {
            return Err(ExtractError::InvalidConfig(
                "DPI must be a positive integer".into(),
            ));
        }
        if c.languages.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "At least one OCR language is required".into(),
            ));
        }
        if c.output.suffix.is_empty() || c.output.suffix.contains(['/', '\\']) {
            return Err(ExtractError::InvalidConfig(format!(
                "Output suffix must be a non-empty file name fragment, got {:?}",
                c.output.suffix
            )));
        }
        Ok(self.config)
    }
}

// ── Engines ──────────────────────────────────────────────────────────────

/// Locations of the external engines.
///
/// Bare program names (`"tesseract"`) are looked up on `PATH`; anything with a
/// directory component must point at an existing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tesseract executable. Default: `tesseract`.
    pub tesseract_cmd: PathBuf,

    /// Directory holding `<lang>.traineddata` files.
    /// `None` uses the engine's compiled-in default.
    pub tessdata_dir: Option<PathBuf>,

    /// Poppler `pdftoppm` executable. Default: `pdftoppm`.
    pub pdftoppm_cmd: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: PathBuf::from("tesseract"),
            tessdata_dir: None,
            pdftoppm_cmd: PathBuf::from("pdftoppm"),
        }
    }
}

/// Resolve a program name or path to an existing executable file.
///
/// Returns `None` when a bare name is not on `PATH` or an explicit path does
/// not exist.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

// ── Languages ────────────────────────────────────────────────────────────

/// Ordered, de-duplicated set of OCR language codes.
///
/// Parses from and displays as the `+`-joined form the engine expects
/// (`"eng+spa+cat"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageSet(Vec<String>);

impl LanguageSet {
    /// Build a set from individual codes, dropping blanks and duplicates.
    pub fn new<I, S>(codes: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim();
            if code.is_empty() {
                continue;
            }
            if !code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(ExtractError::InvalidConfig(format!(
                    "Invalid language code '{code}'"
                )));
            }
            if !out.iter().any(|c| c == code) {
                out.push(code.to_string());
            }
        }
        if out.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "At least one OCR language is required".into(),
            ));
        }
        Ok(Self(out))
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect())
    }
}

impl FromStr for LanguageSet {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split(['+', ',']))
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("+"))
    }
}

impl TryFrom<String> for LanguageSet {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageSet> for String {
    fn from(value: LanguageSet) -> Self {
        value.to_string()
    }
}

// ── Output / formatting ──────────────────────────────────────────────────

/// How the output file name and location are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Appended to the document stem. Default: `_extracted_text.txt`.
    pub suffix: String,
    /// Write here instead of beside the source document.
    pub directory: Option<PathBuf>,
    /// Insert a `_YYYYmmdd_HHMMSS` timestamp between stem and suffix.
    pub timestamped: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            directory: None,
            timestamped: false,
        }
    }
}

/// Formatter behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormatMode {
    /// Collapse every whitespace run, line breaks included, to one space.
    #[default]
    Collapse,
    /// Keep paragraph breaks; collapse only horizontal whitespace.
    PreserveParagraphs,
}
