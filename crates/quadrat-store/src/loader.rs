//! Dataset loading and load notification.
//!
//! Fetching bytes is someone else's job (HTTP, bundled files, caches);
//! the loader consumes a completed byte buffer or a fetch failure, builds
//! the store, and notifies registered observers exactly once per load so
//! map layers can redraw when a dataset becomes queryable.

use crate::store::GridOccurrenceStore;
use bytes::Bytes;
use parking_lot::Mutex;
use quadrat_common::{QuadratError, Result};
use std::path::Path;
use std::sync::Arc;

/// Outcome of one dataset load, delivered to observers.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// The dataset parsed and is ready to query.
    Loaded(Arc<GridOccurrenceStore>),
    /// The fetch or parse failed; the store stays unavailable.
    Failed(String),
}

type Observer = Box<dyn Fn(&LoadEvent) + Send + Sync>;

/// Builds stores from fetched buffers and fans out load notifications.
#[derive(Default)]
pub struct DatasetLoader {
    observers: Mutex<Vec<Observer>>,
}

impl DatasetLoader {
    /// Creates a loader with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for load outcomes.
    pub fn on_load<F>(&self, observer: F)
    where
        F: Fn(&LoadEvent) + Send + Sync + 'static,
    {
        self.observers.lock().push(Box::new(observer));
    }

    /// Completes a load with a fetched buffer.
    ///
    /// Parses the buffer into a store and notifies observers of the
    /// outcome. Errors are returned as well as broadcast, so callers can
    /// propagate them with `?`.
    pub fn complete(&self, buffer: Bytes) -> Result<Arc<GridOccurrenceStore>> {
        match GridOccurrenceStore::open(buffer) {
            Ok(store) => {
                let store = Arc::new(store);
                self.notify(&LoadEvent::Loaded(Arc::clone(&store)));
                Ok(store)
            }
            Err(e) => {
                self.notify(&LoadEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Reports a failed fetch.
    ///
    /// Notifies observers and returns the error for the caller to
    /// propagate.
    pub fn fail(&self, reason: impl Into<String>) -> QuadratError {
        let error = QuadratError::LoadFailure(reason.into());
        self.notify(&LoadEvent::Failed(error.to_string()));
        error
    }

    /// Loads a dataset file from disk.
    ///
    /// Used by tooling and tests; production map layers feed `complete`
    /// from their own fetch pipeline.
    pub fn load_from_path(&self, path: &Path) -> Result<Arc<GridOccurrenceStore>> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => return Err(self.fail(format!("{}: {}", path.display(), e))),
        };
        self.complete(Bytes::from(data))
    }

    fn notify(&self, event: &LoadEvent) {
        for observer in self.observers.lock().iter() {
            observer(event);
        }
    }
}

impl std::fmt::Debug for DatasetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}
