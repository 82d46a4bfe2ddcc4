//! Input validation: make sure the document is worth rasterising.
//!
//! Runs before the scratch directory exists, so a bad path fails with a
//! precise error and leaves nothing behind. The `%PDF` magic check turns
//! "pdftoppm exited with 1" into a message an operator can act on.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path: it must exist, be readable, be non-empty and
/// start with the `%PDF` magic bytes.
pub fn resolve_document(path: &Path) -> Result<PathBuf, ExtractError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(ExtractError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => return Err(ExtractError::FileNotFound { path }),
    };

    let len = file.metadata().map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        return Err(ExtractError::EmptyDocument { path });
    }

    // Shorter than the magic itself counts as not a PDF; `magic` is zero-padded.
    let mut head = Vec::with_capacity(4);
    let read = file.take(4).read_to_end(&mut head);
    if read.is_err() || head != b"%PDF" {
        let mut magic = [0u8; 4];
        magic[..head.len()].copy_from_slice(&head);
        return Err(ExtractError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {} ({} bytes)", path.display(), len);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_document(Path::new("/definitely/not/a/real/file.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_document(dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.pdf");
        std::fs::write(&p, b"").unwrap();
        let err = resolve_document(&p).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument { .. }));
    }

    #[test]
    fn wrong_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("scan.pdf");
        std::fs::write(&p, b"\x89PNG rest").unwrap();
        match resolve_document(&p).unwrap_err() {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_shorter_than_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tiny.pdf");
        std::fs::write(&p, b"%P").unwrap();
        match resolve_document(&p).unwrap_err() {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"%P\0\0"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_header_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ok.pdf");
        std::fs::write(&p, b"%PDF-1.7\n%%EOF").unwrap();
        assert_eq!(resolve_document(&p).unwrap(), p);
    }
}
