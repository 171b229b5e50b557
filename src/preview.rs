use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::store::{FileHandle, FileId, FileKind};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported content: {0}")]
    Unsupported(String),
    #[error("Allocator error: {0}")]
    Backend(String),
}

/// Abstraction over preview URL allocation backends.
/// A URL stays valid until `revoke` is called with it; the cache layer
/// guarantees each allocated URL is revoked exactly once.
pub trait PreviewAllocator: Send + Sync {
    fn allocate(&self, file: &FileHandle) -> Result<String, PreviewError>;
    fn revoke(&self, url: &str);
}

/// Encodes image bytes as `data:` URLs. Data URLs carry their own payload,
/// so `revoke` has nothing to free; the cache bookkeeping still applies.
pub struct DataUrlPreviews;

impl PreviewAllocator for DataUrlPreviews {
    fn allocate(&self, file: &FileHandle) -> Result<String, PreviewError> {
        Ok(format!(
            "data:{};base64,{}",
            file.mime_type(),
            base64_encode(file.content())
        ))
    }

    fn revoke(&self, _url: &str) {}
}

/// Cached preview URLs keyed by file identity.
///
/// URLs are allocated lazily, for image files only, on first read. An
/// entry is released when its record leaves the collection or the owning
/// pipeline is torn down; removal happens under the cache lock, so a
/// racing release cannot revoke the same URL twice.
#[derive(Clone)]
pub struct PreviewCache {
    inner: Arc<Inner>,
}

struct Inner {
    allocator: Arc<dyn PreviewAllocator>,
    urls: Mutex<HashMap<FileId, String>>,
}

impl PreviewCache {
    pub fn new(allocator: Arc<dyn PreviewAllocator>) -> Self {
        PreviewCache {
            inner: Arc::new(Inner {
                allocator,
                urls: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Preview URL for an image file, allocating on first read. Non-image
    /// files and failed allocations yield `None`.
    pub fn url_for(&self, file: &FileHandle) -> Option<String> {
        if file.kind() != FileKind::Image {
            return None;
        }
        let mut urls = self.inner.urls.lock().expect("preview cache mutex poisoned");
        if let Some(url) = urls.get(&file.id()) {
            return Some(url.clone());
        }
        match self.inner.allocator.allocate(file) {
            Ok(url) => {
                urls.insert(file.id(), url.clone());
                Some(url)
            }
            Err(e) => {
                tracing::warn!(file_id = %file.id(), error = %e, "Failed to allocate preview");
                None
            }
        }
    }

    /// Revoke and forget the cached URL for a file, if one was allocated.
    pub fn release(&self, id: FileId) {
        let url = self
            .inner
            .urls
            .lock()
            .expect("preview cache mutex poisoned")
            .remove(&id);
        if let Some(url) = url {
            self.inner.allocator.revoke(&url);
        }
    }

    /// Revoke every cached URL.
    pub fn release_all(&self) {
        let urls: Vec<String> = self
            .inner
            .urls
            .lock()
            .expect("preview cache mutex poisoned")
            .drain()
            .map(|(_, url)| url)
            .collect();
        for url in urls {
            self.inner.allocator.revoke(&url);
        }
    }
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}
