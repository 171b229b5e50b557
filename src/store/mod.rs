pub mod models;
mod reducer;
mod state;

pub use models::{Action, FileHandle, FileId, FileKind, FileMeta, FileRecord, UploadStatus};
pub use state::{Store, StoreState, Subscription, ValueChangeFn};
