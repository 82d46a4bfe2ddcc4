//! Output naming and atomic file writes.

use crate::config::OutputOptions;
use crate::error::ExtractError;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp layout used in timestamped output names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Compute where the text extracted from `document` goes.
///
/// `<stem><suffix>`, or `<stem>_<YYYYmmdd_HHMMSS><suffix>` when
/// `options.timestamped` is set (`now` is ignored otherwise). The file lands
/// in `options.directory` when given, else next to the document.
pub fn output_path(document: &Path, options: &OutputOptions, now: NaiveDateTime) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let name = if options.timestamped {
        format!("{stem}_{}{}", now.format(TIMESTAMP_FORMAT), options.suffix)
    } else {
        format!("{stem}{}", options.suffix)
    };

    let dir = match &options.directory {
        Some(dir) => dir.clone(),
        None => document
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    dir.join(name)
}

/// Write `text` to `path` atomically.
///
/// Parent directories are created first. The content goes to a sibling
/// `.tmp` file which is then renamed over `path`, so readers never observe a
/// partial file.
pub fn write_output(path: &Path, text: &str) -> Result<PathBuf, ExtractError> {
    let write_failed = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    debug!("Writing {} bytes to {}", text.len(), tmp_path.display());
    if let Err(e) = std::fs::write(&tmp_path, text) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_failed(e));
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_failed(e));
    }

    info!("Text saved to {}", path.display());
    Ok(path.to_path_buf())
}
