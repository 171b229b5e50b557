use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::UploadConfig;
use crate::preview::{DataUrlPreviews, PreviewAllocator, PreviewCache};
use crate::store::{Action, FileHandle, FileId, Store, ValueChangeFn};
use crate::upload::{spawn_upload, Uploader};
use crate::validate::{self, Rejection};
use crate::view::FileView;

/// How long the `invalid` flag stays set after a rejection.
const INVALID_WINDOW: Duration = Duration::from_millis(2000);

/// Clipboard payload item. Only file items contribute candidates.
#[derive(Debug, Clone)]
pub enum PasteItem {
    Text(String),
    File(FileHandle),
}

/// The raw input shapes, each reduced to one ordered candidate sequence.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// File-picker selection.
    Picker(Vec<FileHandle>),
    /// Drop payload. Clears the drag-over flag before screening.
    DragDrop(Vec<FileHandle>),
    /// Clipboard contents. Clears the drag-over flag; an all-text paste is
    /// a no-op.
    Paste(Vec<PasteItem>),
    /// Authoritative external list, reconciled without screening or upload
    /// kickoff.
    Controlled(Vec<FileHandle>),
}

/// Callbacks fired while screening and committing a batch. All optional.
#[derive(Default)]
pub struct UploadHooks {
    /// Fired with the full ordered membership whenever it changes.
    pub on_value_change: Option<ValueChangeFn>,
    /// Fired once per batch with the accepted subset.
    pub on_accept: Option<Box<dyn Fn(&[FileHandle]) + Send + Sync>>,
    /// Fired per accepted file.
    pub on_file_accept: Option<Box<dyn Fn(&FileHandle) + Send + Sync>>,
    /// Fired once per rejected file with the first applicable reason.
    pub on_file_reject: Option<Box<dyn Fn(&FileHandle, &str) + Send + Sync>>,
    /// Custom screening; a returned message rejects the file with exactly
    /// that message.
    pub on_file_validate: Option<Box<dyn Fn(&FileHandle) -> Option<String> + Send + Sync>>,
}

/// Constructor options for [`FileUpload`].
#[derive(Default)]
pub struct FileUploadOptions {
    pub config: UploadConfig,
    pub hooks: UploadHooks,
    /// Transport driven for each accepted batch. Without one, accepted
    /// files are marked successful immediately.
    pub uploader: Option<Arc<dyn Uploader>>,
    /// Preview URL backend. Defaults to [`DataUrlPreviews`].
    pub previews: Option<Arc<dyn PreviewAllocator>>,
    /// Initial membership, reconciled once at construction.
    pub initial_files: Vec<FileHandle>,
}

/// What one submitted event did.
#[derive(Debug, Default)]
pub struct Intake {
    /// Candidates that passed screening, already committed to the store.
    pub accepted: Vec<FileHandle>,
    /// Candidates screened out, with the reason reported for each.
    pub rejected: Vec<Rejection>,
    /// The spawned upload task, when an uploader ran for this batch.
    pub upload: Option<JoinHandle<()>>,
}

/// Widget-independent file-upload pipeline: store, validator, event
/// normalizer, upload orchestrator, and preview lifecycle wired together.
///
/// Input collaborators feed raw events through [`FileUpload::submit`];
/// rendering collaborators subscribe via [`FileUpload::store`] and read
/// per-file projections with [`FileUpload::file_view`].
pub struct FileUpload {
    config: UploadConfig,
    store: Arc<Store>,
    previews: PreviewCache,
    uploader: Option<Arc<dyn Uploader>>,
    on_accept: Option<Box<dyn Fn(&[FileHandle]) + Send + Sync>>,
    on_file_accept: Option<Box<dyn Fn(&FileHandle) + Send + Sync>>,
    on_file_reject: Option<Box<dyn Fn(&FileHandle, &str) + Send + Sync>>,
    on_file_validate: Option<Box<dyn Fn(&FileHandle) -> Option<String> + Send + Sync>>,
    invalid_epoch: Arc<AtomicU64>,
}

impl FileUpload {
    pub fn new(options: FileUploadOptions) -> Self {
        let FileUploadOptions {
            config,
            hooks,
            uploader,
            previews,
            initial_files,
        } = options;

        let allocator = previews.unwrap_or_else(|| Arc::new(DataUrlPreviews));
        let previews = PreviewCache::new(allocator);
        let store = Arc::new(Store::with_value_change(
            previews.clone(),
            hooks.on_value_change,
        ));

        let upload = FileUpload {
            config,
            store,
            previews,
            uploader,
            on_accept: hooks.on_accept,
            on_file_accept: hooks.on_file_accept,
            on_file_reject: hooks.on_file_reject,
            on_file_validate: hooks.on_file_validate,
            invalid_epoch: Arc::new(AtomicU64::new(0)),
        };

        if !initial_files.is_empty() {
            upload.store.dispatch(Action::SetFiles(initial_files));
        }

        upload
    }

    /// Feed one raw input event through normalization, screening, and
    /// commit. Accepted files enter the store and, with an uploader
    /// configured, an upload task is spawned for the batch.
    pub fn submit(&self, source: FileSource) -> Intake {
        match source {
            FileSource::Picker(files) => self.on_files_change(files),
            FileSource::DragDrop(files) => {
                self.store.dispatch(Action::SetDragOver(false));
                self.on_files_change(files)
            }
            FileSource::Paste(items) => {
                self.store.dispatch(Action::SetDragOver(false));
                let files = items
                    .into_iter()
                    .filter_map(|item| match item {
                        PasteItem::File(file) => Some(file),
                        PasteItem::Text(_) => None,
                    })
                    .collect();
                self.on_files_change(files)
            }
            FileSource::Controlled(files) => {
                self.store.dispatch(Action::SetFiles(files));
                Intake::default()
            }
        }
    }

    /// Shared entry point for picker, drop, and paste candidates.
    fn on_files_change(&self, candidates: Vec<FileHandle>) -> Intake {
        if self.config.disabled {
            return Intake::default();
        }

        let mut seen = HashSet::new();
        let candidates: Vec<FileHandle> = candidates
            .into_iter()
            .filter(|file| seen.insert(file.id()))
            .collect();

        let current_count = self.store.get_state().files.len();
        let screened = validate::screen(
            candidates,
            current_count,
            &self.config,
            self.on_file_validate.as_deref(),
        );

        for rejection in &screened.rejected {
            tracing::warn!(
                file_id = %rejection.file.id(),
                name = %rejection.file.name(),
                reason = %rejection.reason,
                "Rejected file"
            );
            if let Some(on_file_reject) = &self.on_file_reject {
                on_file_reject(&rejection.file, &rejection.reason);
            }
        }
        if !screened.rejected.is_empty() {
            self.flag_invalid();
        }

        let accepted = screened.accepted;
        let mut upload = None;
        if !accepted.is_empty() {
            self.store.dispatch(Action::AddFiles(accepted.clone()));
            tracing::debug!(count = accepted.len(), "Accepted files");

            if let Some(on_accept) = &self.on_accept {
                on_accept(&accepted);
            }
            if let Some(on_file_accept) = &self.on_file_accept {
                for file in &accepted {
                    on_file_accept(file);
                }
            }

            upload = self.start_upload(&accepted);
        }

        Intake {
            accepted,
            rejected: screened.rejected,
            upload,
        }
    }

    fn start_upload(&self, accepted: &[FileHandle]) -> Option<JoinHandle<()>> {
        match &self.uploader {
            Some(uploader) => Some(spawn_upload(
                Arc::clone(&self.store),
                Arc::clone(uploader),
                accepted.to_vec(),
            )),
            // Local-only mode: nothing to transport, so accepted files are
            // complete as soon as they are tracked.
            None => {
                for file in accepted {
                    self.store.dispatch(Action::SetSuccess { id: file.id() });
                }
                None
            }
        }
    }

    /// Set the `invalid` flag and schedule its clear. Each rejection starts
    /// a new window; an older timer never clears a newer window.
    fn flag_invalid(&self) {
        self.store.dispatch(Action::SetInvalid(true));
        let epoch = self.invalid_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let invalid_epoch = Arc::clone(&self.invalid_epoch);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            tokio::time::sleep(INVALID_WINDOW).await;
            if invalid_epoch.load(Ordering::SeqCst) == epoch {
                store.dispatch(Action::SetInvalid(false));
            }
        });
    }

    /// Remove one tracked file, releasing its preview URL.
    pub fn remove_file(&self, id: FileId) {
        self.store.dispatch(Action::RemoveFile { id });
    }

    /// Drop every tracked file and reset the `invalid` flag.
    pub fn clear(&self) {
        self.store.dispatch(Action::Clear);
    }

    pub fn set_drag_over(&self, drag_over: bool) {
        self.store.dispatch(Action::SetDragOver(drag_over));
    }

    /// Render-ready projection of one tracked file. Allocates the preview
    /// URL for image files on first read.
    pub fn file_view(&self, id: FileId) -> Option<FileView> {
        let state = self.store.get_state();
        let record = state.files.iter().find(|r| r.file.id() == id)?;
        Some(FileView::build(record, self.previews.url_for(&record.file)))
    }

    /// Projections for every tracked file, in collection order.
    pub fn views(&self) -> Vec<FileView> {
        self.store
            .get_state()
            .files
            .iter()
            .map(|record| FileView::build(record, self.previews.url_for(&record.file)))
            .collect()
    }

    /// The underlying store, for dispatching and subscribing directly.
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }
}

impl Drop for FileUpload {
    fn drop(&mut self) {
        self.previews.release_all();
    }
}
