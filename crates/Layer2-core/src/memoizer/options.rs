//! Per-callable memoization options

use memokit_foundation::{MemoConfig, Storage, StorageMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How one callable is memoized
///
/// ```rust,ignore
/// let opts = MemoOptions::<Frame>::disk().cache_folder("/data/frames");
/// let peek = MemoOptions::<Frame>::disk().readonly(true);
/// let custom = MemoOptions::custom(Arc::new(MyStore::new()));
/// ```
pub struct MemoOptions<V> {
    mode: StorageMode,
    cache_folder: Option<PathBuf>,
    readonly: bool,
    storage: Option<Arc<dyn Storage<V>>>,
}

impl<V> MemoOptions<V> {
    pub fn with_mode(mode: StorageMode) -> Self {
        Self {
            mode,
            cache_folder: None,
            readonly: false,
            storage: None,
        }
    }

    pub fn memory() -> Self {
        Self::with_mode(StorageMode::Memory)
    }

    pub fn disk() -> Self {
        Self::with_mode(StorageMode::Disk)
    }

    pub fn identity() -> Self {
        Self::with_mode(StorageMode::Identity)
    }

    /// Use a caller-supplied storage; bypasses the mode's default backend
    pub fn custom(storage: Arc<dyn Storage<V>>) -> Self {
        Self {
            storage: Some(storage),
            ..Self::with_mode(StorageMode::Custom)
        }
    }

    /// Mode and readonly flag from configuration
    pub fn from_config(config: &MemoConfig) -> Self {
        Self::with_mode(config.mode()).readonly(config.is_readonly())
    }

    /// Pin a disk storage to its own folder
    ///
    /// The folder is fixed for the storage's lifetime and ignores the
    /// registry's default folder.
    pub fn cache_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.cache_folder = Some(folder.into());
        self
    }

    /// Honor existing entries but never write new ones
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn folder(&self) -> Option<&Path> {
        self.cache_folder.as_deref()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn storage(&self) -> Option<&Arc<dyn Storage<V>>> {
        self.storage.as_ref()
    }
}

impl<V> Default for MemoOptions<V> {
    fn default() -> Self {
        Self::memory()
    }
}

impl<V> Clone for MemoOptions<V> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            cache_folder: self.cache_folder.clone(),
            readonly: self.readonly,
            storage: self.storage.clone(),
        }
    }
}

impl<V> std::fmt::Debug for MemoOptions<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoOptions")
            .field("mode", &self.mode)
            .field("cache_folder", &self.cache_folder)
            .field("readonly", &self.readonly)
            .field("storage", &self.storage.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memokit_foundation::MemoryStorage;

    #[test]
    fn test_builders() {
        let opts = MemoOptions::<i64>::disk().cache_folder("/tmp/x").readonly(true);
        assert_eq!(opts.mode(), StorageMode::Disk);
        assert_eq!(opts.folder(), Some(Path::new("/tmp/x")));
        assert!(opts.is_readonly());
        assert!(opts.storage().is_none());
    }

    #[test]
    fn test_custom_sets_mode() {
        let opts = MemoOptions::<i64>::custom(Arc::new(MemoryStorage::new("f")));
        assert_eq!(opts.mode(), StorageMode::Custom);
        assert_eq!(opts.storage().map(|s| s.name()), Some("f"));
        assert!(format!("{:?}", opts).contains("\"f\""));
    }

    #[test]
    fn test_from_config() {
        let config = MemoConfig::new().default_mode(StorageMode::Identity).readonly(true);
        let opts = MemoOptions::<i64>::from_config(&config);
        assert_eq!(opts.mode(), StorageMode::Identity);
        assert!(opts.is_readonly());
        assert_eq!(MemoOptions::<i64>::default().mode(), StorageMode::Memory);
    }
}
