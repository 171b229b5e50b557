mod driver;
mod local;

pub use driver::UploadContext;
pub use local::LocalUploader;

pub(crate) use driver::spawn_upload;

use async_trait::async_trait;

use crate::store::FileHandle;

/// Boxed error at the uploader boundary. A batch-level `Err` marks every
/// file of the batch failed with the error's message.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Abstraction over upload transports.
/// The core treats upload as one opaque async operation per accepted batch,
/// reported back through the [`UploadContext`] it is handed.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, files: &[FileHandle], ctx: &UploadContext) -> Result<(), BoxError>;
}
