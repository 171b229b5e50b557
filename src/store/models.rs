use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity for a tracked file. Clones of a [`FileHandle`] share the
/// id assigned at construction; a handle freshly built from the same bytes
/// gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(Uuid);

impl FileId {
    fn new() -> Self {
        FileId(Uuid::new_v4())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable metadata captured when a handle is constructed.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileMeta {
    /// Format the byte size for display ("0 B", "512 B", "1.5 KB", "2.0 MB").
    pub fn human_size(&self) -> String {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        if self.byte_size < 1024 {
            return format!("{} {}", self.byte_size, UNITS[0]);
        }
        let mut value = self.byte_size as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Opaque, cheaply clonable handle to file bytes plus metadata. Equality and
/// hashing go by [`FileId`], so a clone compares equal to its original.
#[derive(Debug, Clone)]
pub struct FileHandle {
    id: FileId,
    meta: Arc<FileMeta>,
    content: Bytes,
}

impl FileHandle {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        FileHandle::build(
            FileMeta {
                name: name.into(),
                mime_type: mime_type.into(),
                byte_size: 0,
                last_modified: None,
            },
            content.into(),
        )
    }

    /// Read a file from disk, guessing its MIME type from the name and
    /// capturing the modification time when the filesystem reports one.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = Bytes::from(tokio::fs::read(path).await?);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let last_modified = tokio::fs::metadata(path)
            .await?
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(FileHandle::build(
            FileMeta {
                name,
                mime_type,
                byte_size: 0,
                last_modified,
            },
            content,
        ))
    }

    fn build(mut meta: FileMeta, content: Bytes) -> Self {
        meta.byte_size = content.len() as u64;
        FileHandle {
            id: FileId::new(),
            meta: Arc::new(meta),
            content,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn mime_type(&self) -> &str {
        &self.meta.mime_type
    }

    pub fn byte_size(&self) -> u64 {
        self.meta.byte_size
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.meta.last_modified
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Final `.`-suffix of the name. Names without a dot have no extension.
    pub fn extension(&self) -> Option<&str> {
        self.meta.name.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_parts(self.mime_type(), self.extension())
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FileHandle {}

impl Hash for FileHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Classification of a file derived from its MIME type and extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Archive,
    Audio,
    Binary,
    Code,
    Document,
    Image,
    Video,
}

impl FileKind {
    /// Derive a classification from a MIME type and an optional extension.
    /// The MIME primary type wins for media and text; otherwise the
    /// extension decides.
    pub fn from_parts(mime_type: &str, extension: Option<&str>) -> Self {
        let primary = mime_type.split('/').next().unwrap_or("");
        match primary {
            "image" => return FileKind::Image,
            "video" => return FileKind::Video,
            "audio" => return FileKind::Audio,
            "text" => return FileKind::Document,
            _ => {}
        }
        let ext = extension.map(str::to_ascii_lowercase).unwrap_or_default();
        match ext.as_str() {
            "txt" | "md" | "rtf" | "pdf" => FileKind::Document,
            "html" | "css" | "js" | "jsx" | "ts" | "tsx" | "json" | "xml" | "php" | "py"
            | "rb" | "java" | "c" | "cpp" | "cs" => FileKind::Code,
            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => FileKind::Archive,
            _ => FileKind::Binary,
        }
    }
}

/// Upload lifecycle state for a tracked file. `Idle` is initial,
/// `Uploading` transient, `Success` and `Error` terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

/// One tracked file: the handle plus its upload state.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub file: FileHandle,
    /// 0-100. Non-decreasing while uploading, forced to 100 on success.
    pub progress: u8,
    pub status: UploadStatus,
    /// Present only when `status` is [`UploadStatus::Error`].
    pub error: Option<String>,
}

impl FileRecord {
    pub(crate) fn new(file: FileHandle) -> Self {
        FileRecord {
            file,
            progress: 0,
            status: UploadStatus::Idle,
            error: None,
        }
    }

    /// Human-readable status line for list renderers.
    pub fn status_line(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Error: {error}");
        }
        match self.status {
            UploadStatus::Uploading => format!("Uploading: {}% complete", self.progress),
            UploadStatus::Success => "Upload complete".to_string(),
            _ => "Ready to upload".to_string(),
        }
    }
}

/// State transitions accepted by [`Store::dispatch`](super::Store::dispatch).
#[derive(Debug, Clone)]
pub enum Action {
    /// Insert fresh idle records for files not already tracked.
    AddFiles(Vec<FileHandle>),
    /// Reconcile the collection to exactly the given membership.
    SetFiles(Vec<FileHandle>),
    /// Clamp to 0-100 and mark the file uploading. No-op if untracked.
    SetProgress { id: FileId, percent: u32 },
    /// Force `progress: 100, status: success`.
    SetSuccess { id: FileId },
    /// Mark the file failed. Progress keeps its last value.
    SetError { id: FileId, message: String },
    /// Drop one record, releasing its cached preview.
    RemoveFile { id: FileId },
    SetDragOver(bool),
    SetInvalid(bool),
    /// Drop everything, releasing all cached previews.
    Clear,
}
