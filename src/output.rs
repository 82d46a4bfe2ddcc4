//! Result types and the aggregated text format.
//!
//! Every page yields exactly one [`PageResult`]. A failed page keeps its slot
//! and renders as [`ERROR_SENTINEL`], so the output always has one
//! `Página {n}` block per page, in page order.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Substituted for dot/underscore runs that usually mark illegible handwriting.
pub const UNREADABLE_SENTINEL: &str = "[VOID DUE TO UNREADABLE HANDWRITTEN TEXT]";

/// Stands in for a page whose recognition failed.
pub const ERROR_SENTINEL: &str = "[ERROR DE PROCESAMIENTO]";

/// Header word preceding every page block.
pub const PAGE_HEADER: &str = "Página";

/// Appended to the document stem to name the output file.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_extracted_text.txt";

pub const DEFAULT_DPI: u32 = 300;

pub const DEFAULT_LANGUAGES: &[&str] = &["eng", "spa", "cat"];

/// What recognition produced for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    /// Formatted recognised text (may be empty for a blank page).
    Text(String),
    /// The engine failed on this page.
    Failed(PageError),
}

/// Outcome for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub outcome: PageOutcome,
    /// Wall-clock time spent in the OCR engine for this page.
    pub duration_ms: u64,
}

impl PageResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, PageOutcome::Text(_))
    }

    /// Page text, or [`ERROR_SENTINEL`] for a failed page.
    pub fn text(&self) -> &str {
        match &self.outcome {
            PageOutcome::Text(t) => t,
            PageOutcome::Failed(_) => ERROR_SENTINEL,
        }
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.outcome {
            PageOutcome::Text(_) => None,
            PageOutcome::Failed(e) => Some(e),
        }
    }
}

/// Timing and page counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub recognized_pages: usize,
    pub failed_pages: usize,
    pub rasterize_duration_ms: u64,
    pub recognize_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Aggregated text, as written to the output file.
    pub text: String,
    pub pages: Vec<PageResult>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    pub fn new(pages: Vec<PageResult>, mut stats: ExtractionStats) -> Self {
        stats.total_pages = pages.len();
        stats.recognized_pages = pages.iter().filter(|p| p.is_ok()).count();
        stats.failed_pages = stats.total_pages - stats.recognized_pages;
        Self {
            text: assemble_text(&pages),
            pages,
            stats,
        }
    }
}

/// Render one page block: `"Página {n}\n\n{text}"`.
pub fn page_block(page: &PageResult) -> String {
    format!("{} {}\n\n{}", PAGE_HEADER, page.page_num, page.text())
}

/// Join page blocks in page order, separated by a blank line.
pub fn assemble_text(pages: &[PageResult]) -> String {
    let mut ordered: Vec<&PageResult> = pages.iter().collect();
    ordered.sort_by_key(|p| p.page_num);
    ordered
        .into_iter()
        .map(page_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}
