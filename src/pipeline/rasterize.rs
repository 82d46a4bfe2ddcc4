//! PDF rasterisation: turn a document into one PNG per page.
//!
//! The conversion itself is delegated to a [`PageRasterizer`] (poppler's
//! `pdftoppm` by default). This module owns the scratch directory the engine
//! writes into and wraps each produced file in a [`PageImage`] that deletes
//! the file when dropped.
//!
//! ## Lifetime of temporary files
//!
//! ```text
//! rasterize()  ── creates TempDir ──▶ engine writes page-*.png
//!      │
//!      ▼
//! RasterizedDocument { pages: Vec<PageImage>, scratch: TempDir }
//!      │  each PageImage dropped right after its OCR call → file removed
//!      ▼
//! TempDir dropped at the end of the run → directory removed
//! ```
//!
//! Both removals happen in `Drop`, so they also run on early returns and
//! panics.

use crate::config::resolve_program;
use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, TempPath};
use tracing::{debug, info};

/// A black-box PDF-to-images converter.
///
/// Implementations write one image per page into `out_dir` and return the
/// paths in page order. They must not retry.
pub trait PageRasterizer: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Rasterise every page of `document` at `dpi` into `out_dir`.
    fn rasterize_into(
        &self,
        document: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError>;
}

/// One rasterised page, owned by the run that created it.
///
/// The image file is deleted when this value is dropped.
#[derive(Debug)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    path: TempPath,
}

impl PageImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// All page images of one document plus the scratch directory holding them.
#[derive(Debug)]
pub struct RasterizedDocument {
    pages: Vec<PageImage>,
    scratch: TempDir,
}

impl RasterizedDocument {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Hand out the pages for consumption. Keep the returned `TempDir` alive
    /// until every page has been dropped.
    pub fn into_parts(self) -> (Vec<PageImage>, TempDir) {
        (self.pages, self.scratch)
    }
}

/// Rasterise `document` at `dpi` using `rasterizer`.
///
/// Creates the per-run scratch directory under `scratch_root` (or the system
/// temp directory). A missing document fails before the directory exists.
/// Fails with [`ExtractError::NoPages`] when the engine produced nothing.
pub fn rasterize(
    rasterizer: &dyn PageRasterizer,
    document: &Path,
    dpi: u32,
    scratch_root: Option<&Path>,
) -> Result<RasterizedDocument, ExtractError> {
    if dpi == 0 {
        return Err(ExtractError::InvalidConfig(
            "DPI must be a positive integer".into(),
        ));
    }
    if !document.is_file() {
        return Err(ExtractError::FileNotFound {
            path: document.to_path_buf(),
        });
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix("expapyrus-");
    let scratch = match scratch_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|e| ExtractError::Internal(format!("Failed to create scratch directory: {e}")))?;

    info!(
        "Converting PDF to images with {} at {} DPI: {}",
        rasterizer.name(),
        dpi,
        document.display()
    );
    let paths = rasterizer.rasterize_into(document, dpi, scratch.path())?;

    if paths.is_empty() {
        return Err(ExtractError::NoPages {
            path: document.to_path_buf(),
        });
    }

    let mut pages = Vec::with_capacity(paths.len());
    for (i, path) in paths.into_iter().enumerate() {
        if !path.is_file() {
            return Err(ExtractError::ConversionFailed {
                path: document.to_path_buf(),
                detail: format!("page image {} is missing", path.display()),
            });
        }
        pages.push(PageImage {
            page_num: i + 1,
            path: TempPath::from_path(path),
        });
    }
    info!("Converted {} pages", pages.len());

    Ok(RasterizedDocument { pages, scratch })
}

// ── pdftoppm ─────────────────────────────────────────────────────────────

/// Output file prefix handed to pdftoppm.
const PAGE_PREFIX: &str = "page";

/// Rasteriser wrapping poppler's `pdftoppm` CLI.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    program: PathBuf,
}

impl Pdftoppm {
    /// Locate the `pdftoppm` executable, failing fast if it is missing.
    pub fn new(program: &Path) -> Result<Self, ExtractError> {
        let program = resolve_program(program).ok_or_else(|| ExtractError::RasterizerNotFound {
            detail: format!("'{}' not found", program.display()),
        })?;
        debug!("pdftoppm: {}", program.display());
        Ok(Self { program })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl PageRasterizer for Pdftoppm {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn rasterize_into(
        &self,
        document: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let conversion_failed = |detail: String| ExtractError::ConversionFailed {
            path: document.to_path_buf(),
            detail,
        };

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(document)
            .arg(out_dir.join(PAGE_PREFIX))
            .output()
            .map_err(|e| conversion_failed(format!("could not run {}: {e}", self.program.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(conversion_failed(format!(
                "pdftoppm {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        collect_page_files(out_dir, PAGE_PREFIX)
            .map_err(|e| conversion_failed(format!("cannot list page images: {e}")))
    }
}

/// List `<prefix>-<n>.png` files in `dir`, ordered by `n`.
///
/// pdftoppm zero-pads the page number to the width of the page count, so a
/// plain lexical sort is not enough once mixed widths appear.
pub fn collect_page_files(dir: &Path, prefix: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut numbered: Vec<(usize, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?;
            let number = name
                .strip_prefix(prefix)?
                .strip_prefix('-')?
                .strip_suffix(".png")?
                .parse::<usize>()
                .ok()?;
            Some((number, path))
        })
        .collect();
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WritesPages(usize);

    impl PageRasterizer for WritesPages {
        fn name(&self) -> &str {
            "test"
        }

        fn rasterize_into(
            &self,
            _document: &Path,
            _dpi: u32,
            out_dir: &Path,
        ) -> Result<Vec<PathBuf>, ExtractError> {
            (1..=self.0)
                .map(|i| {
                    let p = out_dir.join(format!("page-{i}.png"));
                    std::fs::write(&p, b"png").unwrap();
                    Ok(p)
                })
                .collect()
        }
    }

    fn sample_pdf(dir: &Path) -> PathBuf {
        let p = dir.join("doc.pdf");
        std::fs::write(&p, b"%PDF-1.4\n").unwrap();
        p
    }

    #[test]
    fn pages_are_numbered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(dir.path());
        let doc = rasterize(&WritesPages(3), &pdf, 300, Some(dir.path())).unwrap();
        let nums: Vec<usize> = doc.pages().iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn dropping_document_removes_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(dir.path());
        let doc = rasterize(&WritesPages(2), &pdf, 150, Some(dir.path())).unwrap();
        let scratch = doc.scratch_path().to_path_buf();
        let first = doc.pages()[0].path().to_path_buf();
        assert!(first.exists());
        drop(doc);
        assert!(!first.exists());
        assert!(!scratch.exists());
    }

    #[test]
    fn dropping_a_page_removes_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(dir.path());
        let doc = rasterize(&WritesPages(2), &pdf, 150, Some(dir.path())).unwrap();
        let (mut pages, scratch) = doc.into_parts();
        let second = pages.pop().unwrap();
        let path = second.path().to_path_buf();
        drop(second);
        assert!(!path.exists());
        assert!(pages[0].path().exists());
        drop(pages);
        drop(scratch);
    }

    #[test]
    fn no_pages_is_an_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("scratch");
        std::fs::create_dir(&root).unwrap();
        let pdf = sample_pdf(dir.path());
        let err = rasterize(&WritesPages(0), &pdf, 300, Some(&root)).unwrap_err();
        assert!(matches!(err, ExtractError::NoPages { .. }));
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn missing_document_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = rasterize(&WritesPages(1), &dir.path().join("nope.pdf"), 300, Some(dir.path()))
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn zero_dpi_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = sample_pdf(dir.path());
        assert!(rasterize(&WritesPages(1), &pdf, 0, Some(dir.path())).is_err());
    }

    #[test]
    fn collect_page_files_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "other.png", "page-3.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = collect_page_files(dir.path(), "page").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn pdftoppm_missing_binary_is_config_error() {
        let err = Pdftoppm::new(Path::new("/no/such/pdftoppm")).unwrap_err();
        assert!(matches!(err, ExtractError::RasterizerNotFound { .. }));
    }
}
