use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::models::{Action, FileHandle, FileId, FileRecord};
use crate::preview::PreviewCache;

/// Snapshot handed to readers and listeners. `drag_over` and `invalid` are
/// transient UI affordance flags; `files` is the authoritative ordered
/// collection.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub files: Vec<FileRecord>,
    pub drag_over: bool,
    pub invalid: bool,
}

type Listener = Arc<dyn Fn(&StoreState) + Send + Sync>;
type ListenerRegistry = Mutex<Vec<(u64, Listener)>>;

/// Hook invoked with the full ordered membership after transitions that
/// change it (`AddFiles`, `RemoveFile`, `Clear`).
pub type ValueChangeFn = Box<dyn Fn(&[FileHandle]) + Send + Sync>;

pub(super) struct Shared {
    pub(super) files: Vec<FileRecord>,
    pub(super) drag_over: bool,
    pub(super) invalid: bool,
}

impl Shared {
    fn snapshot(&self) -> StoreState {
        StoreState {
            files: self.files.clone(),
            drag_over: self.drag_over,
            invalid: self.invalid,
        }
    }
}

/// What a committed transition asks the store to do once the state lock is
/// released.
#[derive(Default)]
pub(super) struct Outcome {
    pub(super) value_change: Option<Vec<FileHandle>>,
    pub(super) released: Vec<FileId>,
}

/// Authoritative ordered collection of tracked files.
///
/// All mutation goes through [`Store::dispatch`]; transitions are atomic
/// with respect to readers. The value-change hook and subscribed listeners
/// run synchronously after the mutation commits and the state lock is
/// released, so they may re-enter the store.
pub struct Store {
    shared: Mutex<Shared>,
    listeners: Arc<ListenerRegistry>,
    next_listener_id: AtomicU64,
    on_value_change: Option<ValueChangeFn>,
    previews: PreviewCache,
}

impl Store {
    /// Store with no value-change hook.
    pub fn new(previews: PreviewCache) -> Self {
        Store::with_value_change(previews, None)
    }

    /// Store that reports membership changes through `on_value_change`.
    pub fn with_value_change(previews: PreviewCache, on_value_change: Option<ValueChangeFn>) -> Self {
        Store {
            shared: Mutex::new(Shared {
                files: Vec::new(),
                drag_over: false,
                invalid: false,
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
            on_value_change,
            previews,
        }
    }

    /// Synchronous snapshot read.
    pub fn get_state(&self) -> StoreState {
        self.shared.lock().expect("store mutex poisoned").snapshot()
    }

    /// Apply a transition. Never panics on domain input; file-keyed actions
    /// for untracked ids are silently ignored. Listeners are notified after
    /// every dispatch, including no-op transitions.
    pub fn dispatch(&self, action: Action) {
        let (outcome, snapshot) = {
            let mut shared = self.shared.lock().expect("store mutex poisoned");
            let outcome = shared.apply(action);
            (outcome, shared.snapshot())
        };

        for id in outcome.released {
            self.previews.release(id);
        }
        if let (Some(hook), Some(files)) = (&self.on_value_change, &outcome.value_change) {
            hook(files);
        }
        for listener in self.listener_snapshot() {
            listener(&snapshot);
        }
    }

    /// Register a listener invoked with the post-transition snapshot after
    /// every dispatch. Dropping the returned guard unregisters it.
    pub fn subscribe(&self, listener: impl Fn(&StoreState) + Send + Sync + 'static) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("listeners mutex poisoned")
            .push((id, Arc::new(listener)));
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    pub(crate) fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    // Listeners are cloned out of the registry before invocation so a
    // listener can dispatch or subscribe without deadlocking.
    fn listener_snapshot(&self) -> Vec<Listener> {
        self.listeners
            .lock()
            .expect("listeners mutex poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Guard for a registered listener. Unsubscribes on drop.
#[must_use = "dropping a Subscription immediately unsubscribes its listener"]
pub struct Subscription {
    listeners: Weak<ListenerRegistry>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .expect("listeners mutex poisoned")
                .retain(|(id, _)| *id != self.id);
        }
    }
}
