//! Eager (full-document) extraction entry points.
//!
//! ## Why an `Extractor` value?
//!
//! Engine discovery (`tesseract`, tessdata, language files, `pdftoppm`) is
//! slow and can fail. Doing it once in [`Extractor::new`] turns a broken
//! install into an immediate configuration error, before any document is
//! touched, and lets one extractor process many documents.
//!
//! ## Why eager vs. streaming?
//!
//! This module waits for all pages, then returns the assembled text. Use
//! [`crate::stream::extract_stream`] to receive pages as they finish.

use crate::config::{EngineConfig, ExtractionConfig};
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::rasterize::{self, PageRasterizer, Pdftoppm};
use crate::pipeline::recognize::{Tesseract, TextRecognizer};
use crate::pipeline::{input, pages, write};
use crate::progress::{ExtractionProgressCallback, NoopProgressCallback};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// A configured extraction pipeline: run settings plus both engines.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer.name())
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Build an extractor over `tesseract` and `pdftoppm`.
    ///
    /// # Errors
    /// Configuration errors only: missing OCR engine, tessdata directory,
    /// language resources or rasteriser.
    ///
    /// # Example
    /// ```rust,no_run
    /// use expapyrus::{EngineConfig, ExtractionConfig, Extractor};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let extractor = Extractor::new(ExtractionConfig::default(), &EngineConfig::default())?;
    /// let output = extractor.extract_blocking("scan.pdf")?;
    /// println!("{}", output.text);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ExtractionConfig, engines: &EngineConfig) -> Result<Self, ExtractError> {
        let recognizer = Tesseract::new(engines, &config.languages)?;
        let rasterizer = Pdftoppm::new(&engines.pdftoppm_cmd)?;
        Ok(Self::with_engines(
            config,
            Arc::new(rasterizer),
            Arc::new(recognizer),
        ))
    }

    /// Build an extractor over caller-supplied engines.
    pub fn with_engines(
        config: ExtractionConfig,
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        Self {
            config,
            rasterizer,
            recognizer,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub(crate) fn progress(&self) -> &dyn ExtractionProgressCallback {
        self.config
            .progress_callback
            .as_deref()
            .unwrap_or(&NoopProgressCallback)
    }

    pub(crate) fn rasterizer(&self) -> &dyn PageRasterizer {
        self.rasterizer.as_ref()
    }

    pub(crate) fn recognizer(&self) -> &dyn TextRecognizer {
        self.recognizer.as_ref()
    }

    /// Extract the text of `document` on the current thread.
    ///
    /// Returns `Ok` even when some or all pages failed recognition; check
    /// `output.stats.failed_pages`.
    ///
    /// # Errors
    /// Fatal document errors only: not found, unreadable, empty, not a PDF,
    /// rasterisation failure, no pages.
    pub fn extract_blocking(&self, document: impl AsRef<Path>) -> Result<ExtractionOutput, ExtractError> {
        let total_start = Instant::now();
        let document = input::resolve_document(document.as_ref())?;
        info!("Starting extraction: {}", document.display());

        // ── Rasterise ────────────────────────────────────────────────────
        let rasterize_start = Instant::now();
        let rasterized = rasterize::rasterize(
            self.rasterizer(),
            &document,
            self.config.dpi,
            self.config.scratch_dir.as_deref(),
        )?;
        let rasterize_duration_ms = rasterize_start.elapsed().as_millis() as u64;

        // ── Recognise ────────────────────────────────────────────────────
        let recognize_start = Instant::now();
        let results = pages::recognize_pages(
            rasterized,
            self.recognizer(),
            &self.config.languages,
            self.config.format_mode,
            self.progress(),
        );
        let recognize_duration_ms = recognize_start.elapsed().as_millis() as u64;

        let output = ExtractionOutput::new(
            results,
            ExtractionStats {
                rasterize_duration_ms,
                recognize_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                ..ExtractionStats::default()
            },
        );
        info!(
            "Extraction complete: {}/{} pages, {}ms total",
            output.stats.recognized_pages, output.stats.total_pages, output.stats.total_duration_ms
        );
        Ok(output)
    }

    /// Extract `document` on tokio's blocking pool.
    pub async fn extract(&self, document: impl AsRef<Path>) -> Result<ExtractionOutput, ExtractError> {
        let this = self.clone();
        let document = document.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || this.extract_blocking(&document))
            .await
            .map_err(|e| ExtractError::Internal(format!("Extraction task panicked: {e}")))?
    }

    /// Extract `document` and write the aggregated text to the configured
    /// output location. Returns the path written and the run statistics.
    pub async fn extract_to_file(
        &self,
        document: impl AsRef<Path>,
    ) -> Result<(PathBuf, ExtractionStats), ExtractError> {
        let document = document.as_ref();
        let output = self.extract(document).await?;
        let path = write::output_path(
            document,
            &self.config.output,
            chrono::Local::now().naive_local(),
        );
        let text = output.text;
        let written = tokio::task::spawn_blocking(move || write::write_output(&path, &text))
            .await
            .map_err(|e| ExtractError::Internal(format!("Write task panicked: {e}")))??;
        Ok((written, output.stats))
    }
}
