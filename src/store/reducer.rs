use std::collections::HashSet;

use super::models::{Action, FileHandle, FileId, FileRecord, UploadStatus};
use super::state::{Outcome, Shared};

impl Shared {
    // ========================================================================
    // Transitions
    // ========================================================================

    pub(super) fn apply(&mut self, action: Action) -> Outcome {
        match action {
            Action::AddFiles(files) => {
                for file in files {
                    if !self.tracks(file.id()) {
                        self.files.push(FileRecord::new(file));
                    }
                }
                Outcome {
                    value_change: Some(self.handles()),
                    ..Outcome::default()
                }
            }
            Action::SetFiles(files) => {
                let keep: HashSet<FileId> = files.iter().map(|f| f.id()).collect();
                let mut released = Vec::new();
                self.files.retain(|record| {
                    let id = record.file.id();
                    if keep.contains(&id) {
                        true
                    } else {
                        released.push(id);
                        false
                    }
                });
                for file in files {
                    if !self.tracks(file.id()) {
                        self.files.push(FileRecord::new(file));
                    }
                }
                // Controlled-mode echo: membership came from the caller, so
                // the value-change hook stays silent.
                Outcome {
                    value_change: None,
                    released,
                }
            }
            Action::SetProgress { id, percent } => {
                if let Some(record) = self.record_mut(id) {
                    // Success and error are terminal; late progress is ignored.
                    if !matches!(record.status, UploadStatus::Success | UploadStatus::Error) {
                        record.progress = percent.min(100) as u8;
                        record.status = UploadStatus::Uploading;
                    }
                }
                Outcome::default()
            }
            Action::SetSuccess { id } => {
                if let Some(record) = self.record_mut(id) {
                    record.progress = 100;
                    record.status = UploadStatus::Success;
                }
                Outcome::default()
            }
            Action::SetError { id, message } => {
                if let Some(record) = self.record_mut(id) {
                    record.status = UploadStatus::Error;
                    record.error = Some(message);
                }
                Outcome::default()
            }
            Action::RemoveFile { id } => {
                let before = self.files.len();
                self.files.retain(|record| record.file.id() != id);
                if self.files.len() == before {
                    return Outcome::default();
                }
                Outcome {
                    value_change: Some(self.handles()),
                    released: vec![id],
                }
            }
            Action::SetDragOver(drag_over) => {
                self.drag_over = drag_over;
                Outcome::default()
            }
            Action::SetInvalid(invalid) => {
                self.invalid = invalid;
                Outcome::default()
            }
            Action::Clear => {
                let released = self.files.iter().map(|r| r.file.id()).collect();
                self.files.clear();
                self.invalid = false;
                Outcome {
                    value_change: Some(Vec::new()),
                    released,
                }
            }
        }
    }

    fn tracks(&self, id: FileId) -> bool {
        self.files.iter().any(|record| record.file.id() == id)
    }

    fn record_mut(&mut self, id: FileId) -> Option<&mut FileRecord> {
        self.files.iter_mut().find(|record| record.file.id() == id)
    }

    fn handles(&self) -> Vec<FileHandle> {
        self.files.iter().map(|record| record.file.clone()).collect()
    }
}
