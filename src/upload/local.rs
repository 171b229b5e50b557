use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::store::FileHandle;

use super::{BoxError, UploadContext, Uploader};

const CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem uploader for development and testing. Writes each
/// file's bytes under the destination directory, reporting progress per
/// chunk. A per-file write failure marks only that file; the rest of the
/// batch still uploads.
pub struct LocalUploader {
    dest_dir: PathBuf,
}

impl LocalUploader {
    pub fn new<P: AsRef<Path>>(dest_dir: P) -> Result<Self, std::io::Error> {
        let dest_dir = dest_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dest_dir)?;
        Ok(Self { dest_dir })
    }

    fn dest_path(&self, file: &FileHandle) -> PathBuf {
        // Strip any path components the name carries.
        let name = Path::new(file.name())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.id().to_string());
        self.dest_dir.join(name)
    }

    async fn write_file(&self, file: &FileHandle, ctx: &UploadContext) -> std::io::Result<()> {
        let path = self.dest_path(file);
        let mut out = tokio::fs::File::create(&path).await?;

        let content = file.content();
        let total = content.len();
        let mut written = 0usize;
        for chunk in content.chunks(CHUNK_SIZE) {
            out.write_all(chunk).await?;
            written += chunk.len();
            ctx.progress(file, (written * 100 / total) as u32);
        }
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Uploader for LocalUploader {
    async fn upload(&self, files: &[FileHandle], ctx: &UploadContext) -> Result<(), BoxError> {
        for file in files {
            match self.write_file(file, ctx).await {
                Ok(()) => ctx.success(file),
                Err(e) => ctx.error(file, e.into()),
            }
        }
        Ok(())
    }
}
