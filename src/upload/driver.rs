use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::store::{Action, FileHandle, FileId, Store};

use super::{BoxError, Uploader};

/// Cadence for throttled progress dispatches, one display frame at 60Hz.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Signal sink handed to an uploader: per-file progress, success, and error
/// reports, translated into store transitions. Progress dispatches are
/// coalesced to frame cadence with the latest reported value winning; a
/// terminal report drops the file's pending progress first, so a lagging
/// flush can never land after success or error.
pub struct UploadContext {
    store: Arc<Store>,
    throttle: ProgressThrottle,
}

impl UploadContext {
    fn new(store: Arc<Store>) -> Self {
        let throttle = ProgressThrottle::new(Arc::clone(&store));
        UploadContext { store, throttle }
    }

    /// Report upload progress for one file, in percent. Values outside
    /// 0-100 are clamped by the store.
    pub fn progress(&self, file: &FileHandle, percent: u32) {
        self.throttle.report(file.id(), percent);
    }

    /// Mark one file successfully uploaded.
    pub fn success(&self, file: &FileHandle) {
        self.throttle.cancel(file.id());
        self.store.dispatch(Action::SetSuccess { id: file.id() });
    }

    /// Mark one file failed.
    pub fn error(&self, file: &FileHandle, error: BoxError) {
        self.throttle.cancel(file.id());
        let message = error_message(error.as_ref());
        tracing::warn!(file_id = %file.id(), name = %file.name(), error = %message, "Upload failed");
        self.store.dispatch(Action::SetError {
            id: file.id(),
            message,
        });
    }
}

/// Drive the injected uploader for one accepted batch. Every file is moved
/// to `uploading` at zero progress before the uploader runs; a batch-level
/// `Err` marks every file failed. Nothing is rethrown past the task.
pub(crate) fn spawn_upload(
    store: Arc<Store>,
    uploader: Arc<dyn Uploader>,
    files: Vec<FileHandle>,
) -> JoinHandle<()> {
    let ctx = UploadContext::new(Arc::clone(&store));
    tokio::spawn(async move {
        for file in &files {
            store.dispatch(Action::SetProgress {
                id: file.id(),
                percent: 0,
            });
        }

        if let Err(e) = uploader.upload(&files, &ctx).await {
            let message = error_message(e.as_ref());
            tracing::warn!(count = files.len(), error = %message, "Upload batch failed");
            for file in &files {
                ctx.throttle.cancel(file.id());
                store.dispatch(Action::SetError {
                    id: file.id(),
                    message: message.clone(),
                });
            }
        }
    })
}

fn error_message(error: &(dyn std::error::Error + Send + Sync)) -> String {
    let message = error.to_string();
    if message.is_empty() {
        "Upload failed".to_string()
    } else {
        message
    }
}

/// Latest-value progress coalescing: at most one pending flush per file,
/// scheduled one frame out. Reports landing while a flush is pending only
/// overwrite the value it will carry.
struct ProgressThrottle {
    store: Arc<Store>,
    pending: Arc<Mutex<HashMap<FileId, u32>>>,
}

impl ProgressThrottle {
    fn new(store: Arc<Store>) -> Self {
        ProgressThrottle {
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn report(&self, id: FileId, percent: u32) {
        let mut pending = self.pending.lock().expect("throttle mutex poisoned");
        if pending.insert(id, percent).is_some() {
            return;
        }
        drop(pending);

        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::time::sleep(FRAME_INTERVAL).await;
            let flushed = pending.lock().expect("throttle mutex poisoned").remove(&id);
            if let Some(percent) = flushed {
                store.dispatch(Action::SetProgress { id, percent });
            }
        });
    }

    fn cancel(&self, id: FileId) {
        self.pending
            .lock()
            .expect("throttle mutex poisoned")
            .remove(&id);
    }
}
