//! Run-wide registries shared by download workers.
//!
//! Both are plain mutex-guarded maps; each check-and-insert happens under a
//! single lock acquisition.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Download keys (final URLs) already claimed during the run.
#[derive(Debug, Default)]
pub struct DownloadRegistry {
    seen: Mutex<HashSet<String>>,
}

impl DownloadRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`. Returns false when it was already claimed.
    ///
    /// An empty key is always allowed and never recorded.
    pub fn allow(&self, key: &str) -> bool {
        if key.is_empty() {
            return true;
        }
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Item folders already produced, keyed by source URL.
#[derive(Debug, Default)]
pub struct FolderRegistry {
    folders: Mutex<HashMap<String, PathBuf>>,
}

impl FolderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `dir` for `source_url`. The first registration wins.
    pub fn register(&self, source_url: &str, dir: &Path) {
        self.folders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(source_url.to_string())
            .or_insert_with(|| dir.to_path_buf());
    }

    /// Registered folder for `source_url`, if it still exists on disk.
    #[must_use]
    pub fn get_existing(&self, source_url: &str) -> Option<PathBuf> {
        let folders = self.folders.lock().unwrap_or_else(PoisonError::into_inner);
        folders.get(source_url).filter(|dir| dir.exists()).cloned()
    }
}
