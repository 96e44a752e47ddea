//! Upload boundary: extension allow-list and scoped staging on disk.
//!
//! A `StagedUpload` owns a `NamedTempFile`; the file is removed when the value
//! is closed or dropped, whichever way the request ends.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::extraction::document::{Document, DocumentFormat};

/// File extensions accepted at the boundary.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

/// Returns the lowercased extension if `filename` has an allowed one.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// An upload written to the staging directory for the duration of one request.
pub struct StagedUpload {
    file: NamedTempFile,
    format: DocumentFormat,
}

impl StagedUpload {
    /// Writes `bytes` to a fresh temp file in `dir`. Blocking.
    pub fn stage(dir: &Path, extension: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("resume-")
            .suffix(&format!(".{extension}"))
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!("File saved to: {}", file.path().display());

        Ok(Self {
            file,
            format: DocumentFormat::from_extension(extension),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the staged file now and logs the outcome. Dropping without
    /// calling this still removes the file, silently.
    pub fn close(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Cleaned up file: {}", path.display()),
            Err(e) => warn!("Failed to clean up {}: {e}", path.display()),
        }
    }

    /// Reads the staged bytes back as a `Document`.
    pub async fn read_document(&self) -> std::io::Result<Document> {
        let bytes = tokio::fs::read(self.file.path()).await?;
        Ok(Document::new(Bytes::from(bytes), self.format))
    }
}


/// Staging directory, created if missing.
pub fn ensure_upload_dir(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}
