//! Error types for the expapyrus library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] (**fatal**): the run cannot proceed at all (OCR engine
//!   missing, language data not installed, document missing or unreadable,
//!   output not writable). Returned as `Err(ExtractError)` from the
//!   [`crate::convert::Extractor`] entry points.
//!
//! * [`PageError`] (**non-fatal**): a single page could not be recognised but
//!   every other page is fine. Stored inside [`crate::output::PageResult`] and
//!   rendered as [`crate::output::ERROR_SENTINEL`] in the aggregated text.
//!
//! [`RecognitionError`] is what a [`crate::pipeline::recognize::TextRecognizer`]
//! returns for one image; the page pipeline turns it into a [`PageError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the expapyrus library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The Tesseract executable could not be found.
    #[error("Tesseract executable not found at '{path}'\nInstall tesseract-ocr or pass --tesseract <PATH>.")]
    EngineNotFound { path: PathBuf },

    /// The configured tessdata directory does not exist.
    #[error("Tessdata directory not found at '{path}'\nPass --tessdata-dir <DIR> pointing at the *.traineddata files.")]
    TessdataNotFound { path: PathBuf },

    /// A requested language has no installed `.traineddata` resource.
    #[error("Language '{language}' is not installed{}", missing_suffix(.location))]
    LanguageNotInstalled {
        language: String,
        location: Option<PathBuf>,
    },

    /// The rasterisation engine (pdftoppm or pdfium) is not available.
    #[error("PDF rasteriser not available: {detail}\nInstall poppler-utils or pass --pdftoppm <PATH>.")]
    RasterizerNotFound { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but has no content.
    #[error("PDF file '{path}' is empty")]
    EmptyDocument { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The rasteriser could not convert the document.
    #[error("Could not convert '{path}' to page images: {detail}")]
    ConversionFailed { path: PathBuf, detail: String },

    /// The rasteriser finished but produced no page images.
    #[error("No page images could be extracted from '{path}'")]
    NoPages { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read or write the settings file.
    #[error("Settings file '{path}': {detail}")]
    Settings { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn missing_suffix(location: &Option<PathBuf>) -> String {
    location
        .as_ref()
        .map(|p| format!(": missing {}", p.display()))
        .unwrap_or_default()
}

/// A non-fatal error for a single page.
///
/// The run continues with the next page; the aggregated text carries
/// [`crate::output::ERROR_SENTINEL`] in this page's place.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The OCR engine failed on this page's image.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },
}

/// Failure of one recognition call.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The engine process could not be started.
    #[error("could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Any other engine-specific failure.
    #[error("{0}")]
    Engine(String),
}

impl RecognitionError {
    /// Convert into the page-level error stored in a
    /// [`crate::output::PageResult`].
    pub fn into_page_error(self, page: usize) -> PageError {
        PageError::RecognitionFailed {
            page,
            detail: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_not_installed_mentions_missing_file() {
        let e = ExtractError::LanguageNotInstalled {
            language: "cat".into(),
            location: Some(PathBuf::from("/usr/share/tessdata/cat.traineddata")),
        };
        let msg = e.to_string();
        assert!(msg.contains("'cat'"), "got: {msg}");
        assert!(msg.contains("cat.traineddata"), "got: {msg}");
    }

    #[test]
    fn language_not_installed_without_location() {
        let e = ExtractError::LanguageNotInstalled {
            language: "spa".into(),
            location: None,
        };
        assert_eq!(e.to_string(), "Language 'spa' is not installed");
    }

    #[test]
    fn recognition_error_becomes_page_error() {
        let e = RecognitionError::Failed {
            program: "tesseract".into(),
            status: "exit status: 1".into(),
            stderr: "Error opening data file".into(),
        };
        let page = e.into_page_error(4);
        let msg = page.to_string();
        assert!(msg.starts_with("Page 4"), "got: {msg}");
        assert!(msg.contains("Error opening data file"), "got: {msg}");
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = ExtractError::OutputWriteFailed {
            path: PathBuf::from("/ro/out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/ro/out.txt"));
    }
}
