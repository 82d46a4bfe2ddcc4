//! # expapyrus
//!
//! Extract plain text from scanned and handwritten PDF documents with OCR.
//!
//! ## Why this crate?
//!
//! Scanned PDFs carry no text layer, so `pdftotext` returns nothing. This
//! crate rasterises every page to a PNG, hands each image to Tesseract, cleans
//! the recognised text and writes one UTF-8 file per document with a
//! `Página {n}` header before each page. Illegible handwriting (runs of dots or
//! underscores in the OCR output) is replaced by a fixed marker, and a page the
//! engine cannot process becomes an error marker without stopping the others.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      check path, size and %PDF magic
//!  ├─ 2. Rasterise  pdftoppm (or pdfium) → one PNG per page in a TempDir
//!  ├─ 3. Recognise  tesseract, one page at a time, in page order
//!  ├─ 4. Format     whitespace cleanup + unreadable-text marker
//!  └─ 5. Output     "Página {n}" blocks → <stem>_extracted_text.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use expapyrus::{EngineConfig, ExtractionConfig, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .languages("eng+spa".parse()?)
//!         .build()?;
//!     let extractor = Extractor::new(config, &EngineConfig::default())?;
//!     let (path, stats) = extractor.extract_to_file("scan.pdf").await?;
//!     eprintln!("{} pages → {}", stats.total_pages, path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `expapyrus` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `pdfium` | off     | In-process rasterisation through `pdfium-render` instead of `pdftoppm` |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! expapyrus = { version = "1.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod settings;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    EngineConfig, ExtractionConfig, ExtractionConfigBuilder, FormatMode, LanguageSet,
    OutputOptions,
};
pub use convert::Extractor;
pub use error::{ExtractError, PageError, RecognitionError};
pub use output::{
    assemble_text, ExtractionOutput, ExtractionStats, PageOutcome, PageResult, ERROR_SENTINEL,
    PAGE_HEADER, UNREADABLE_SENTINEL,
};
pub use pipeline::format::{format_text, format_text_with};
pub use pipeline::rasterize::{PageRasterizer, Pdftoppm};
pub use pipeline::recognize::{Tesseract, TextRecognizer};
pub use progress::{
    ChannelProgressCallback, ExtractionProgressCallback, NoopProgressCallback, ProgressCallback,
    ProgressEvent,
};
pub use settings::Settings;
pub use stream::{extract_stream, PageStream};
