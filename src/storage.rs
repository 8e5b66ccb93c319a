//! Attachment storage
//!
//! Downloaded attachments are classified by MIME type (falling back to the
//! file extension) and written below a root directory as
//! `<root>/<kind>/<file name>`, renaming on collision.

use crate::error::{Error, Result};
use crate::http::DownloadedFile;
use crate::utils::{get_unique_path, sanitize_file_name};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Number of times a write is retried when another writer claims the same name
const MAX_CLAIM_ATTEMPTS: u32 = 5;

/// Broad category of a stored file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Raster or vector image
    Image,
    /// Video file
    Video,
    /// PDF document
    Pdf,
    /// Office or text document
    Document,
    /// Anything else
    Other,
}

impl FileKind {
    /// Classify by MIME type, then by file extension
    pub fn classify(content_type: Option<&str>, file_name: &str) -> Self {
        content_type
            .and_then(Self::from_mime)
            .or_else(|| Self::from_extension(Path::new(file_name)))
            .unwrap_or(FileKind::Other)
    }

    /// Directory name used under the storage root
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileKind::Image => "images",
            FileKind::Video => "videos",
            FileKind::Pdf => "pdfs",
            FileKind::Document => "documents",
            FileKind::Other => "other",
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            m if m.starts_with("image/") => Some(FileKind::Image),
            m if m.starts_with("video/") => Some(FileKind::Video),
            m if m.starts_with("text/") => Some(FileKind::Document),
            "application/msword"
            | "application/rtf"
            | "application/vnd.oasis.opendocument.text"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/vnd.ms-powerpoint"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            | "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(FileKind::Document)
            }
            // Generic binary says nothing; let the extension decide
            _ => None,
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "tif" | "tiff" => {
                Some(FileKind::Image)
            }
            "mp4" | "mov" | "webm" | "mkv" | "avi" | "m4v" => Some(FileKind::Video),
            "pdf" => Some(FileKind::Pdf),
            "doc" | "docx" | "odt" | "rtf" | "txt" | "md" | "ppt" | "pptx" | "xls" | "xlsx"
            | "csv" => Some(FileKind::Document),
            _ => None,
        }
    }
}

/// A file written by an [`AttachmentStorage`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Category the file was stored under
    pub kind: FileKind,
    /// Where the file lives
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// MIME type reported when downloaded
    pub content_type: Option<String>,
}

/// Persists downloaded attachments
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Store a file and report where it went
    async fn store(&self, file: DownloadedFile) -> Result<StoredFile>;
}

/// Filesystem-backed [`AttachmentStorage`]
#[derive(Clone, Debug)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    /// Store files below `root`; directories are created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AttachmentStorage for FsAttachmentStore {
    async fn store(&self, file: DownloadedFile) -> Result<StoredFile> {
        let kind = FileKind::classify(file.content_type.as_deref(), &file.file_name);
        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let wanted = dir.join(sanitize_file_name(&file.file_name));

        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let path = get_unique_path(&wanted)?;
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let mut handle = match opened {
                Ok(handle) => handle,
                // Another writer took the name between the check and the open
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            handle.write_all(&file.bytes).await?;
            handle.flush().await?;

            tracing::debug!(
                path = %path.display(),
                kind = ?kind,
                size = file.bytes.len(),
                "attachment stored"
            );

            return Ok(StoredFile {
                kind,
                path,
                size: file.bytes.len() as u64,
                content_type: file.content_type,
            });
        }

        Err(Error::Other(format!(
            "could not claim a file name for {} after {} attempts",
            wanted.display(),
            MAX_CLAIM_ATTEMPTS
        )))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file(name: &str, content_type: Option<&str>, bytes: &[u8]) -> DownloadedFile {
        DownloadedFile {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn mime_type_wins_over_extension() {
        assert_eq!(
            FileKind::classify(Some("image/png"), "diagram.pdf"),
            FileKind::Image
        );
        assert_eq!(
            FileKind::classify(Some("application/pdf; charset=binary"), "x"),
            FileKind::Pdf
        );
    }

    #[test]
    fn generic_mime_falls_back_to_extension() {
        assert_eq!(
            FileKind::classify(Some("application/octet-stream"), "lecture.MP4"),
            FileKind::Video
        );
        assert_eq!(FileKind::classify(None, "notes.docx"), FileKind::Document);
        assert_eq!(FileKind::classify(None, "archive.zip"), FileKind::Other);
        assert_eq!(FileKind::classify(None, "no-extension"), FileKind::Other);
    }

    #[tokio::test]
    async fn stores_under_kind_directory() {
        let dir = tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let stored = store
            .store(file("slides.pdf", Some("application/pdf"), b"%PDF"))
            .await
            .unwrap();

        assert_eq!(stored.kind, FileKind::Pdf);
        assert_eq!(stored.path, dir.path().join("pdfs").join("slides.pdf"));
        assert_eq!(stored.size, 4);
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn colliding_names_are_renamed() {
        let dir = tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let first = store
            .store(file("cover.png", Some("image/png"), b"one"))
            .await
            .unwrap();
        let second = store
            .store(file("cover.png", Some("image/png"), b"two"))
            .await
            .unwrap();

        assert_eq!(first.path, dir.path().join("images").join("cover.png"));
        assert_eq!(second.path, dir.path().join("images").join("cover (1).png"));
        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn hostile_names_stay_inside_root() {
        let dir = tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let stored = store
            .store(file("../../escape.png", None, b"x"))
            .await
            .unwrap();

        assert!(stored.path.starts_with(dir.path().join("images")));
    }
}
