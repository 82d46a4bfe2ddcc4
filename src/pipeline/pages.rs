//! Page pipeline: recognise every rasterised page, in order, one at a time.
//!
//! A recognition failure never escapes this module. It becomes a
//! [`PageOutcome::Failed`] in that page's slot and the loop moves on, so a
//! document with N pages always yields N results numbered 1..=N.

use crate::config::{FormatMode, LanguageSet};
use crate::output::{PageOutcome, PageResult};
use crate::pipeline::format::format_text_with;
use crate::pipeline::rasterize::RasterizedDocument;
use crate::pipeline::recognize::TextRecognizer;
use crate::progress::ExtractionProgressCallback;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Recognise all pages of `document`, consuming it, and collect the results.
///
/// Each page image is deleted as soon as its recognition call returns,
/// whatever the outcome; the scratch directory goes when this function
/// returns. After every page `progress.on_progress(completed / total)` is
/// reported, reaching exactly `1.0` after the last one.
pub fn recognize_pages(
    document: RasterizedDocument,
    recognizer: &dyn TextRecognizer,
    languages: &LanguageSet,
    format_mode: FormatMode,
    progress: &dyn ExtractionProgressCallback,
) -> Vec<PageResult> {
    let mut results = Vec::with_capacity(document.len());
    for_each_page(document, recognizer, languages, format_mode, progress, |r| {
        results.push(r)
    });
    results
}

/// Like [`recognize_pages`], but hands each result to `emit` as soon as the
/// page is done. Returns the number of pages recognised successfully.
pub fn for_each_page<F>(
    document: RasterizedDocument,
    recognizer: &dyn TextRecognizer,
    languages: &LanguageSet,
    format_mode: FormatMode,
    progress: &dyn ExtractionProgressCallback,
    mut emit: F,
) -> usize
where
    F: FnMut(PageResult),
{
    let (pages, _scratch) = document.into_parts();
    let total = pages.len();
    progress.on_extraction_start(total);

    let mut success = 0;
    for (done, page) in pages.into_iter().enumerate() {
        let page_num = page.page_num;
        progress.on_page_start(page_num, total);

        let start = Instant::now();
        let recognized = recognizer.recognize(page.path(), languages);
        let duration_ms = start.elapsed().as_millis() as u64;
        drop(page);

        let outcome = match recognized {
            Ok(raw) => {
                let text = format_text_with(&raw, format_mode);
                debug!(
                    "Page {}: {} chars raw, {} formatted, {}ms",
                    page_num,
                    raw.len(),
                    text.len(),
                    duration_ms
                );
                progress.on_page_complete(page_num, total, text.len());
                PageOutcome::Text(text)
            }
            Err(e) => {
                let err = e.into_page_error(page_num);
                warn!("{}", err);
                progress.on_page_error(page_num, total, &err.to_string());
                PageOutcome::Failed(err)
            }
        };

        if matches!(outcome, PageOutcome::Text(_)) {
            success += 1;
        }
        emit(PageResult {
            page_num,
            outcome,
            duration_ms,
        });

        let completed = done + 1;
        let fraction = completed as f64 / total as f64;
        info!(
            "Processed page {}/{} ({:.2}%)",
            completed,
            total,
            fraction * 100.0
        );
        progress.on_progress(fraction);
    }

    progress.on_extraction_complete(total, success);
    success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractError, RecognitionError};
    use crate::output::ERROR_SENTINEL;
    use crate::pipeline::rasterize::{rasterize, PageRasterizer};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct Pages(usize);

    impl PageRasterizer for Pages {
        fn name(&self) -> &str {
            "test"
        }

        fn rasterize_into(
            &self,
            _document: &Path,
            _dpi: u32,
            out_dir: &Path,
        ) -> Result<Vec<PathBuf>, ExtractError> {
            Ok((1..=self.0)
                .map(|i| {
                    let p = out_dir.join(format!("page-{i}.png"));
                    std::fs::write(&p, format!("page {i}")).unwrap();
                    p
                })
                .collect())
        }
    }

    /// Echoes the image file content; fails for the listed page numbers.
    struct Echo {
        fail: Vec<usize>,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl TextRecognizer for Echo {
        fn recognize(&self, image: &Path, _languages: &LanguageSet) -> Result<String, RecognitionError> {
            self.seen.lock().unwrap().push(image.to_path_buf());
            let content = std::fs::read_to_string(image).unwrap();
            let n: usize = content.trim_start_matches("page ").parse().unwrap();
            if self.fail.contains(&n) {
                Err(RecognitionError::Engine(format!("cannot read page {n}")))
            } else {
                Ok(format!("  text   of\n\n\n\npage {n} ...  "))
            }
        }
    }

    #[derive(Default)]
    struct Fractions(Mutex<Vec<f64>>);

    impl ExtractionProgressCallback for Fractions {
        fn on_progress(&self, fraction: f64) {
            self.0.lock().unwrap().push(fraction);
        }
    }

    fn run(n: usize, fail: Vec<usize>) -> (Vec<PageResult>, Vec<f64>, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let doc = rasterize(&Pages(n), &pdf, 300, Some(dir.path())).unwrap();
        let echo = Echo {
            fail,
            seen: Mutex::new(Vec::new()),
        };
        let fractions = Fractions::default();
        let results = recognize_pages(
            doc,
            &echo,
            &LanguageSet::default(),
            FormatMode::Collapse,
            &fractions,
        );
        let seen = echo.seen.into_inner().unwrap();
        (results, fractions.0.into_inner().unwrap(), seen)
    }

    #[test]
    fn one_result_per_page_in_order() {
        let (results, _, _) = run(4, vec![]);
        let nums: Vec<usize> = results.iter().map(|r| r.page_num).collect();
        assert_eq!(nums, vec![1, 2, 3, 4]);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn text_is_formatted() {
        let (results, _, _) = run(1, vec![]);
        assert_eq!(
            results[0].text(),
            "text of page 1 [VOID DUE TO UNREADABLE HANDWRITTEN TEXT]"
        );
    }

    #[test]
    fn failed_page_gets_sentinel_and_later_pages_continue() {
        let (results, _, _) = run(3, vec![2]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(results[1].text(), ERROR_SENTINEL);
        assert!(results[1].error().is_some());
        assert!(results[2].is_ok());
    }

    #[test]
    fn all_pages_failing_still_yields_every_page() {
        let (results, fractions, _) = run(2, vec![1, 2]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_ok()));
        assert_eq!(fractions.last(), Some(&1.0));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one_once() {
        let (_, fractions, _) = run(3, vec![2]);
        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.iter().filter(|f| **f == 1.0).count(), 1);
        assert_eq!(*fractions.last().unwrap(), 1.0);
    }

    #[test]
    fn page_images_removed_after_run() {
        let (_, _, seen) = run(3, vec![1]);
        assert_eq!(seen.len(), 3);
        for p in seen {
            assert!(!p.exists(), "left behind: {}", p.display());
        }
    }
}
