//! Registry Entry - one registered storage

use memokit_foundation::{Storage, StorageMode};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Type-erased `Arc<dyn Storage<V>>` plus bookkeeping
pub(crate) struct StorageEntry {
    storage: Arc<dyn Any + Send + Sync>,
    value_type: &'static str,
    folder: Option<PathBuf>,
    replace_count: u32,
}

impl StorageEntry {
    pub(crate) fn new<V: 'static>(storage: Arc<dyn Storage<V>>) -> Self {
        Self {
            storage: Arc::new(storage),
            value_type: std::any::type_name::<V>(),
            folder: None,
            replace_count: 0,
        }
    }

    /// Remember the folder a disk storage was pinned to
    pub(crate) fn with_folder(mut self, folder: Option<&Path>) -> Self {
        self.folder = folder.map(Path::to_path_buf);
        self
    }

    /// The storage, if it was registered for values of type `V`
    pub(crate) fn downcast<V: 'static>(&self) -> Option<Arc<dyn Storage<V>>> {
        self.storage.downcast_ref::<Arc<dyn Storage<V>>>().cloned()
    }

    pub(crate) fn value_type(&self) -> &'static str {
        self.value_type
    }

    pub(crate) fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub(crate) fn replaced_by(mut self, next: StorageEntry) -> Self {
        self.storage = next.storage;
        self.value_type = next.value_type;
        self.folder = next.folder;
        self.replace_count += 1;
        self
    }

    pub(crate) fn info(&self, mode: StorageMode, name: &str) -> EntryInfo {
        EntryInfo {
            mode,
            name: name.to_string(),
            value_type: self.value_type,
            folder: self.folder.clone(),
            replace_count: self.replace_count,
        }
    }
}

/// Snapshot of a registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub mode: StorageMode,
    pub name: String,
    /// Rust type name of the stored values
    pub value_type: &'static str,
    /// Folder a disk storage was pinned to; `None` follows the default
    pub folder: Option<PathBuf>,
    /// How often the mapping was replaced by `register`
    pub replace_count: u32,
}
