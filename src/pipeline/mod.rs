//! Pipeline stages for PDF-to-text extraction.
//!
//! Each submodule implements one step and is testable on its own with fake
//! engines plugged in through the [`rasterize::PageRasterizer`] and
//! [`recognize::TextRecognizer`] traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ pages ───────────────────▶ write
//! (%PDF)    (pdftoppm)    (recognize ─▶ format)      (atomic)
//! ```
//!
//! 1. [`input`]: validate the document path before anything is created
//! 2. [`rasterize`]: one PNG per page into a per-run scratch directory
//! 3. [`pages`]: OCR each page in order; failures become page errors
//! 4. [`recognize`]: the `tesseract` adapter
//! 5. [`format`]: deterministic cleanup of raw OCR text
//! 6. [`write`]: output naming and the atomic file write
//!
//! The `pdfium` feature adds [`render`], an in-process alternative to
//! `pdftoppm`.

pub mod format;
pub mod input;
pub mod pages;
pub mod rasterize;
pub mod recognize;
#[cfg(feature = "pdfium")]
pub mod render;
pub mod write;
