//! In-process rasterisation through pdfium (feature `pdfium`).
//!
//! An alternative to the `pdftoppm` subprocess for hosts that ship a pdfium
//! shared library instead of poppler. Pages are rendered at `dpi / 72` scale
//! and saved as PNG into the scratch directory, so the rest of the pipeline
//! cannot tell the two engines apart.
//!
//! pdfium keeps thread-local state; the whole run already executes on a
//! blocking thread, and bindings are created per call rather than shared.

use crate::error::ExtractError;
use crate::pipeline::rasterize::PageRasterizer;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rasteriser backed by a pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Directory containing the pdfium library; `None` uses the system search path.
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind once to verify the library is present, failing fast otherwise.
    pub fn new(library_dir: Option<PathBuf>) -> Result<Self, ExtractError> {
        let rasterizer = Self { library_dir };
        rasterizer.bind()?;
        Ok(rasterizer)
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractError::RasterizerNotFound {
            detail: format!("cannot load pdfium: {e:?}"),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn rasterize_into(
        &self,
        document: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let pdfium = self.bind()?;
        let conversion_failed = |detail: String| ExtractError::ConversionFailed {
            path: document.to_path_buf(),
            detail,
        };

        let doc = pdfium
            .load_pdf_from_file(document, None)
            .map_err(|e| conversion_failed(format!("{e:?}")))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut paths = Vec::new();
        for (idx, page) in doc.pages().iter().enumerate() {
            let page_num = idx + 1;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| conversion_failed(format!("page {page_num}: {e:?}")))?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            let path = out_dir.join(format!("page-{page_num}.png"));
            image
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| conversion_failed(format!("page {page_num}: {e}")))?;
            paths.push(path);
        }

        Ok(paths)
    }
}
