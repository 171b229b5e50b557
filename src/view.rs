use serde::Serialize;

use crate::store::{FileKind, FileRecord, UploadStatus};

/// Render-ready projection of one tracked file: everything a list item,
/// progress bar, or thumbnail needs, with no handle to the bytes.
#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    pub id: String,
    pub name: String,
    pub byte_size: u64,
    /// Formatted size, e.g. "1.5 KB".
    pub size: String,
    pub kind: FileKind,
    pub progress: u8,
    pub status: UploadStatus,
    /// Derived status text, e.g. "Uploading: 40% complete".
    pub status_line: String,
    pub error: Option<String>,
    /// Present for image files once a preview has been allocated.
    pub preview_url: Option<String>,
}

impl FileView {
    pub(crate) fn build(record: &FileRecord, preview_url: Option<String>) -> Self {
        FileView {
            id: record.file.id().to_string(),
            name: record.file.name().to_string(),
            byte_size: record.file.byte_size(),
            size: record.file.meta().human_size(),
            kind: record.file.kind(),
            progress: record.progress,
            status: record.status,
            status_line: record.status_line(),
            error: record.error.clone(),
            preview_url,
        }
    }
}
