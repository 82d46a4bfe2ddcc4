//! Streaming extraction API: emit pages as they complete.
//!
//! ## Why stream?
//!
//! A long handwritten scan takes a while to OCR. A stream lets callers show
//! each page as soon as it is recognised instead of waiting for the whole
//! document. Pages arrive in page order, since recognition is sequential.
//!
//! Fatal document errors (missing file, not a PDF, rasterisation failure)
//! are returned before the stream exists. The stream then carries one
//! `Ok(PageResult)` per page, failed pages included. If the recognition
//! task dies (a panicking engine binding), the stream ends with a single
//! `Err(ExtractError::Internal)` instead of falling silent.

use crate::convert::Extractor;
use crate::error::ExtractError;
use crate::output::PageResult;
use crate::pipeline::{input, pages, rasterize};
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, ExtractError>> + Send>>;

/// Pages buffered between the recognition thread and the consumer.
const STREAM_BUFFER: usize = 4;

/// Extract `document`, streaming pages as they are ready.
///
/// Dropping the stream does not stop recognition of the remaining pages;
/// their results are discarded and temporary files are still removed.
pub async fn extract_stream(
    extractor: &Extractor,
    document: impl AsRef<Path>,
) -> Result<PageStream, ExtractError> {
    let document = input::resolve_document(document.as_ref())?;
    info!("Starting streaming extraction: {}", document.display());

    // ── Rasterise up front so fatal errors surface here ──────────────────
    let this = extractor.clone();
    let (this, rasterized) = tokio::task::spawn_blocking(move || {
        let config = this.config();
        let rasterized = rasterize::rasterize(
            this.rasterizer(),
            &document,
            config.dpi,
            config.scratch_dir.as_deref(),
        );
        (this, rasterized)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Rasterisation task panicked: {e}")))?;
    let rasterized = rasterized?;

    // ── Recognise in the background ──────────────────────────────────────
    let (tx, rx) = tokio::sync::mpsc::channel(STREAM_BUFFER);
    let page_tx = tx.clone();
    let recognition = tokio::task::spawn_blocking(move || {
        let config = this.config();
        let success = pages::for_each_page(
            rasterized,
            this.recognizer(),
            &config.languages,
            config.format_mode,
            this.progress(),
            |result| {
                if page_tx.blocking_send(Ok(result)).is_err() {
                    debug!("Page stream receiver dropped");
                }
            },
        );
        debug!("Streaming extraction finished: {} pages recognised", success);
    });

    // The stream closes once both senders are gone.
    tokio::spawn(async move {
        if let Err(e) = recognition.await {
            error!("Recognition task failed: {}", e);
            let _ = tx
                .send(Err(ExtractError::Internal(format!(
                    "Extraction task panicked: {e}"
                ))))
                .await;
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
