//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline recognises each page.
//!
//! Callbacks run on the pipeline's blocking thread. A front-end that owns an
//! interactive thread should forward them rather than touch its widgets
//! directly; [`ChannelProgressCallback`] does exactly that through a tokio
//! channel.
//!
//! # Example
//!
//! ```rust
//! use expapyrus::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     fractions: Mutex<Vec<f64>>,
//! }
//!
//! impl ExtractionProgressCallback for Recorder {
//!     fn on_progress(&self, fraction: f64) {
//!         self.fractions.lock().unwrap().push(fraction);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Called by the page pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after rasterisation, before the first page is recognised.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the OCR engine runs on a page.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page is recognised.
    ///
    /// `text_len` is the byte length of the formatted page text.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when recognition of a page fails. Processing continues.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Fraction of pages finished, `completed / total`, after every page.
    ///
    /// Values never decrease; `1.0` is reported once, after the last page.
    fn on_progress(&self, fraction: f64) {
        let _ = fraction;
    }

    /// Called once after all pages have been attempted.
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// A progress event, as sent by [`ChannelProgressCallback`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum ProgressEvent {
    Started { total_pages: usize },
    PageStarted { page_num: usize, total_pages: usize },
    PageCompleted { page_num: usize, total_pages: usize, text_len: usize },
    PageFailed { page_num: usize, total_pages: usize, error: String },
    Progress(f64),
    Finished { total_pages: usize, success_count: usize },
}

/// Forwards every callback as a [`ProgressEvent`] over an unbounded channel.
///
/// Sends never block; events are dropped silently once the receiver is gone.
pub struct ChannelProgressCallback {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgressCallback {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create a callback together with the receiving end of its channel.
    pub fn channel() -> (
        Arc<Self>,
        tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Arc::new(Self::new(tx)), rx)
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ExtractionProgressCallback for ChannelProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.send(ProgressEvent::Started { total_pages });
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        self.send(ProgressEvent::PageStarted {
            page_num,
            total_pages,
        });
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        self.send(ProgressEvent::PageCompleted {
            page_num,
            total_pages,
            text_len,
        });
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.send(ProgressEvent::PageFailed {
            page_num,
            total_pages,
            error: error.to_string(),
        });
    }

    fn on_progress(&self, fraction: f64) {
        self.send(ProgressEvent::Progress(fraction));
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        self.send(ProgressEvent::Finished {
            total_pages,
            success_count,
        });
    }
}
