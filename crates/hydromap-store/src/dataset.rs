//! Modification-time coherent cache for auxiliary datasets.
//!
//! Datasets are loaded once per path and reused until the file's modification
//! time changes on disk. There is no other invalidation.

use hydromap_core::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

struct Loaded<T> {
    data: Arc<T>,
    modified: SystemTime,
}

/// Map from file path to its loaded dataset and the mtime it was loaded at
pub struct DatasetCache<T> {
    entries: Mutex<HashMap<PathBuf, Loaded<T>>>,
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<T> std::fmt::Debug for DatasetCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache").field("entries", &self.len()).finish()
    }
}

impl<T> DatasetCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Loaded<T>>> {
        // A panicking loader never leaves a half-written entry behind
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached dataset for `path`, loading it when absent or when the
    /// file changed since the last load.
    ///
    /// The lock is held while loading, so concurrent callers for a stale path
    /// wait for a single load.
    pub fn get_or_load<F>(&self, path: &Path, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let modified = std::fs::metadata(path)?.modified()?;
        let mut entries = self.lock();

        if let Some(entry) = entries.get(path) {
            if entry.modified == modified {
                return Ok(Arc::clone(&entry.data));
            }
            tracing::debug!(path = %path.display(), "Dataset changed on disk, reloading");
        }

        let data = Arc::new(loader(path)?);
        entries.insert(path.to_path_buf(), Loaded { data: Arc::clone(&data), modified });
        Ok(data)
    }

    /// Drop the cached entry for a path
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
