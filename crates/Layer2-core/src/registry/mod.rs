//! # Storage Registry
//!
//! Directory of the storages backing memoized callables, partitioned by
//! [`StorageMode`]. At most one storage exists per `(mode, callable name)`.
//!
//! The registry is an explicit context object: the application creates one
//! (usually wrapped in an `Arc`) and hands it to every [`Memoizer`] that
//! should share storages.
//!
//! ## Default disk folder
//!
//! Disk storages without their own folder resolve their root through the
//! registry's [`DiskFolder`] on every operation, so
//! [`set_default_disk_folder`](StorageRegistry::set_default_disk_folder)
//! takes effect for storages that already exist.
//!
//! ```rust,ignore
//! let registry = Arc::new(StorageRegistry::new());
//! registry.set_default_disk_folder("/var/cache/pipeline");
//!
//! let memo = Memoizer::new(registry.clone());
//! // ...
//! registry.unregister(StorageMode::Disk, "pipeline::load");
//! ```
//!
//! [`Memoizer`]: crate::Memoizer

mod entry;
mod locks;

pub use entry::EntryInfo;

use entry::StorageEntry;
use locks::KeyLocks;
use memokit_foundation::{
    CacheKey, DiskFolder, DiskStorage, Error, IdentityStorage, MemoConfig, MemoryStorage, Result,
    Storage, StorageMode,
};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Values a memoized callable may return
///
/// Anything clonable, serializable and shareable across threads qualifies.
pub trait MemoValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> MemoValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Process-wide directory of storages, one partition per mode
pub struct StorageRegistry {
    partitions: RwLock<HashMap<StorageMode, HashMap<String, StorageEntry>>>,
    disk_folder: DiskFolder,
    locks: KeyLocks,
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("entries", &self.entries())
            .field("disk_folder", &self.disk_folder.get())
            .finish()
    }
}

impl StorageRegistry {
    pub fn new() -> Self {
        let partitions = StorageMode::ALL
            .into_iter()
            .map(|mode| (mode, HashMap::new()))
            .collect();

        Self {
            partitions: RwLock::new(partitions),
            disk_folder: DiskFolder::new(),
            locks: KeyLocks::default(),
        }
    }

    pub fn with_disk_folder(folder: impl Into<PathBuf>) -> Self {
        let registry = Self::new();
        registry.disk_folder.set(folder);
        registry
    }

    pub fn from_config(config: &MemoConfig) -> Self {
        let registry = Self::new();
        if let Some(folder) = config.disk_folder() {
            registry.disk_folder.set(folder);
        }
        registry
    }

    // ========================================================================
    // Lookup / registration
    // ========================================================================

    /// Storage registered under `(mode, name)`
    ///
    /// Fails when the storage was registered for another value type.
    pub fn get<V: 'static>(&self, mode: StorageMode, name: &str) -> Result<Option<Arc<dyn Storage<V>>>> {
        let partitions = self.partitions.read();
        match partitions.get(&mode).and_then(|p| p.get(name)) {
            Some(entry) => downcast(entry, mode, name).map(Some),
            None => Ok(None),
        }
    }

    /// Existing storage for `(mode, name)`, or the one `create` builds
    ///
    /// Concurrent first calls for the same pair end up with the same
    /// instance; `create` runs at most once per pair.
    pub fn get_or_create<V, F>(&self, mode: StorageMode, name: &str, create: F) -> Result<Arc<dyn Storage<V>>>
    where
        V: 'static,
        F: FnOnce() -> Result<Arc<dyn Storage<V>>>,
    {
        self.resolve(mode, name, None, create)
    }

    /// Existing storage for `(mode, name)`, or the mode's default one
    ///
    /// A `folder` that differs from the one the existing storage was built
    /// with is rejected rather than ignored.
    pub fn get_or_create_default<V: MemoValue>(
        &self,
        mode: StorageMode,
        name: &str,
        folder: Option<&Path>,
    ) -> Result<Arc<dyn Storage<V>>> {
        self.resolve(mode, name, folder, || self.create_storage(mode, name, folder))
    }

    fn resolve<V, F>(&self, mode: StorageMode, name: &str, folder: Option<&Path>, create: F) -> Result<Arc<dyn Storage<V>>>
    where
        V: 'static,
        F: FnOnce() -> Result<Arc<dyn Storage<V>>>,
    {
        {
            let partitions = self.partitions.read();
            if let Some(entry) = partitions.get(&mode).and_then(|p| p.get(name)) {
                check_folder(entry, mode, name, folder)?;
                return downcast(entry, mode, name);
            }
        }

        let mut partitions = self.partitions.write();
        let partition = partitions.entry(mode).or_default();
        if let Some(entry) = partition.get(name) {
            check_folder(entry, mode, name, folder)?;
            return downcast(entry, mode, name);
        }

        let storage = create()?;
        partition.insert(name.to_string(), StorageEntry::new(storage.clone()).with_folder(folder));
        info!(%mode, name, "Created storage");
        Ok(storage)
    }

    /// Register `storage` under `(mode, name)`, replacing any previous one
    ///
    /// Returns `true` when a mapping was replaced. The old storage's
    /// contents are not carried over.
    pub fn register<V: 'static>(&self, mode: StorageMode, name: &str, storage: Arc<dyn Storage<V>>) -> bool {
        let mut partitions = self.partitions.write();
        let partition = partitions.entry(mode).or_default();
        let next = StorageEntry::new(storage);

        match partition.remove(name) {
            Some(previous) => {
                partition.insert(name.to_string(), previous.replaced_by(next));
                info!(%mode, name, "Replaced storage");
                true
            }
            None => {
                partition.insert(name.to_string(), next);
                info!(%mode, name, "Registered storage");
                false
            }
        }
    }

    /// Drop the mapping for `(mode, name)`
    ///
    /// Stored data is untouched; a disk storage created again later sees
    /// the same files.
    pub fn unregister(&self, mode: StorageMode, name: &str) -> bool {
        let removed = self
            .partitions
            .write()
            .get_mut(&mode)
            .map(|p| p.remove(name).is_some())
            .unwrap_or(false);

        if removed {
            info!(%mode, name, "Unregistered storage");
        }
        removed
    }

    pub fn contains(&self, mode: StorageMode, name: &str) -> bool {
        self.partitions
            .read()
            .get(&mode)
            .map(|p| p.contains_key(name))
            .unwrap_or(false)
    }

    /// Registered callable names for a mode, sorted
    pub fn names(&self, mode: StorageMode) -> Vec<String> {
        let mut names: Vec<String> = self
            .partitions
            .read()
            .get(&mode)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn entries(&self) -> Vec<EntryInfo> {
        let partitions = self.partitions.read();
        let mut entries: Vec<EntryInfo> = partitions
            .iter()
            .flat_map(|(mode, p)| p.iter().map(move |(name, e)| e.info(*mode, name)))
            .collect();
        entries.sort_by(|a, b| (a.mode, &a.name).cmp(&(b.mode, &b.name)));
        entries
    }

    pub fn len(&self) -> usize {
        self.partitions.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Default storages
    // ========================================================================

    /// Build the storage a mode provides out of the box
    ///
    /// `folder` pins a disk storage to its own root. Custom mode has no
    /// default storage.
    pub fn create_storage<V: MemoValue>(
        &self,
        mode: StorageMode,
        name: &str,
        folder: Option<&Path>,
    ) -> Result<Arc<dyn Storage<V>>> {
        if folder.is_some() && mode != StorageMode::Disk {
            return Err(Error::InvalidStorageConfiguration(format!(
                "cache folder given for {} storage '{}'; only disk storages take a folder",
                mode, name
            )));
        }

        let storage: Arc<dyn Storage<V>> = match mode {
            StorageMode::Memory => Arc::new(MemoryStorage::new(name)),
            StorageMode::Disk => match folder {
                Some(folder) => Arc::new(DiskStorage::with_folder(name, folder)),
                None => Arc::new(DiskStorage::new(name, self.disk_folder.clone())),
            },
            StorageMode::Identity => Arc::new(IdentityStorage::new(name)),
            StorageMode::Custom => {
                return Err(Error::InvalidStorageConfiguration(format!(
                    "custom mode for '{}' requires a storage implementation",
                    name
                )))
            }
        };
        Ok(storage)
    }

    // ========================================================================
    // Default disk folder
    // ========================================================================

    /// Change the root of every disk storage without its own folder
    pub fn set_default_disk_folder(&self, folder: impl Into<PathBuf>) {
        let folder = folder.into();
        info!(folder = %folder.display(), "Default disk folder changed");
        self.disk_folder.set(folder);
    }

    /// Fall back to the current directory
    pub fn clear_default_disk_folder(&self) {
        debug!("Default disk folder cleared");
        self.disk_folder.clear();
    }

    pub fn default_disk_folder(&self) -> Option<PathBuf> {
        self.disk_folder.get()
    }

    /// Shared handle disk storages resolve their root through
    pub fn disk_folder(&self) -> DiskFolder {
        self.disk_folder.clone()
    }

    // ========================================================================
    // Key locks
    // ========================================================================

    /// Run `f` as the only holder of `(callable, key)` among all users of
    /// this registry
    pub(crate) fn with_key_lock<R>(&self, callable: &str, key: &CacheKey, f: impl FnOnce() -> R) -> R {
        self.locks.with_lock(callable, key, f)
    }
}

fn check_folder(entry: &StorageEntry, mode: StorageMode, name: &str, folder: Option<&Path>) -> Result<()> {
    match folder {
        Some(requested) if entry.folder() != Some(requested) => {
            let current = match entry.folder() {
                Some(path) => path.display().to_string(),
                None => "the default disk folder".to_string(),
            };
            Err(Error::InvalidStorageConfiguration(format!(
                "{} storage '{}' already uses {}; cannot switch it to {}",
                mode,
                name,
                current,
                requested.display()
            )))
        }
        _ => Ok(()),
    }
}

fn downcast<V: 'static>(entry: &StorageEntry, mode: StorageMode, name: &str) -> Result<Arc<dyn Storage<V>>> {
    entry.downcast::<V>().ok_or_else(|| {
        Error::InvalidStorageConfiguration(format!(
            "{} storage '{}' holds {} values, not {}",
            mode,
            name,
            entry.value_type(),
            std::any::type_name::<V>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use memokit_foundation::{build_key, disk_dir_name, CallArgs, Signature};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn key(name: &str, n: i64) -> memokit_foundation::CacheKey {
        build_key(&Signature::new(name).param("n"), &CallArgs::new().arg(n)).unwrap()
    }

    fn memory(name: &str) -> Result<Arc<dyn Storage<i64>>> {
        Ok(Arc::new(MemoryStorage::new(name)))
    }

    #[test]
    fn test_get_or_create_once() {
        let registry = StorageRegistry::new();
        let created = AtomicUsize::new(0);

        for _ in 0..3 {
            registry
                .get_or_create::<i64, _>(StorageMode::Memory, "f", || {
                    created.fetch_add(1, Ordering::SeqCst);
                    registry.create_storage(StorageMode::Memory, "f", None)
                })
                .unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(registry.contains(StorageMode::Memory, "f"));
        assert!(!registry.contains(StorageMode::Disk, "f"));
    }

    #[test]
    fn test_same_instance_returned() {
        let registry = StorageRegistry::new();
        let a = registry
            .get_or_create::<i64, _>(StorageMode::Memory, "f", || {
                memory("f")
            })
            .unwrap();
        a.store(&key("f", 1), &1).unwrap();

        let b = registry.get::<i64>(StorageMode::Memory, "f").unwrap().unwrap();
        assert_eq!(b.fetch(&key("f", 1)).unwrap(), Some(1));
    }

    #[test]
    fn test_concurrent_first_use_single_storage() {
        let registry = StorageRegistry::new();
        let created = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let storage = registry
                        .get_or_create::<i64, _>(StorageMode::Memory, "hot", || {
                            created.fetch_add(1, Ordering::SeqCst);
                            memory("hot")
                        })
                        .unwrap();
                    storage.store(&key("hot", 1), &1).unwrap();
                });
            }
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        let storage = registry.get::<i64>(StorageMode::Memory, "hot").unwrap().unwrap();
        assert_eq!(storage.len().unwrap(), 1);
    }

    #[test]
    fn test_register_replaces() {
        let registry = StorageRegistry::new();
        let first: Arc<dyn Storage<i64>> = Arc::new(MemoryStorage::new("f"));
        first.store(&key("f", 1), &1).unwrap();

        assert!(!registry.register(StorageMode::Custom, "f", first));
        assert!(registry.register::<i64>(StorageMode::Custom, "f", Arc::new(MemoryStorage::new("f"))));

        let current = registry.get::<i64>(StorageMode::Custom, "f").unwrap().unwrap();
        assert!(current.is_empty().unwrap());
        assert_eq!(registry.entries()[0].replace_count, 1);
    }

    #[test]
    fn test_unregister() {
        let registry = StorageRegistry::new();
        registry.register::<i64>(StorageMode::Memory, "f", Arc::new(MemoryStorage::new("f")));

        assert!(registry.unregister(StorageMode::Memory, "f"));
        assert!(!registry.unregister(StorageMode::Memory, "f"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_modes_are_partitioned() {
        let registry = StorageRegistry::new();
        registry.register::<i64>(StorageMode::Memory, "f", Arc::new(MemoryStorage::new("f")));
        registry.register::<i64>(StorageMode::Identity, "f", Arc::new(IdentityStorage::new("f")));
        registry.register::<i64>(StorageMode::Memory, "g", Arc::new(MemoryStorage::new("g")));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(StorageMode::Memory), vec!["f", "g"]);
        assert_eq!(registry.names(StorageMode::Identity), vec!["f"]);
        assert!(registry.names(StorageMode::Disk).is_empty());
    }

    #[test]
    fn test_value_type_mismatch() {
        let registry = StorageRegistry::new();
        registry.register::<i64>(StorageMode::Memory, "f", Arc::new(MemoryStorage::new("f")));

        let err = registry.get::<String>(StorageMode::Memory, "f").err().unwrap();
        assert!(matches!(err, Error::InvalidStorageConfiguration(_)));
        assert!(err.to_string().contains("i64"));
    }

    #[test]
    fn test_custom_has_no_default() {
        let registry = StorageRegistry::new();
        let err = registry
            .create_storage::<i64>(StorageMode::Custom, "f", None)
            .err().unwrap();
        assert!(matches!(err, Error::InvalidStorageConfiguration(_)));
    }

    #[test]
    fn test_folder_only_for_disk() {
        let registry = StorageRegistry::new();
        let err = registry
            .create_storage::<i64>(StorageMode::Memory, "f", Some(Path::new("/tmp")))
            .err().unwrap();
        assert!(matches!(err, Error::InvalidStorageConfiguration(_)));
    }

    #[test]
    fn test_default_folder_propagates() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let registry = StorageRegistry::with_disk_folder(first.path());

        let storage = registry
            .get_or_create::<i64, _>(StorageMode::Disk, "h", || {
                registry.create_storage(StorageMode::Disk, "h", None)
            })
            .unwrap();
        storage.store(&key("h", 1), &10).unwrap();
        assert!(first.path().join(disk_dir_name("h")).is_dir());

        registry.set_default_disk_folder(second.path());
        assert_eq!(registry.default_disk_folder().as_deref(), Some(second.path()));
        assert_eq!(storage.fetch(&key("h", 1)).unwrap(), None);

        storage.store(&key("h", 2), &20).unwrap();
        assert!(second.path().join(disk_dir_name("h")).is_dir());
    }

    #[test]
    fn test_pinned_folder_recorded() {
        let pinned = TempDir::new().unwrap();
        let registry = StorageRegistry::new();

        registry
            .get_or_create_default::<i64>(StorageMode::Disk, "h", Some(pinned.path()))
            .unwrap();
        registry
            .get_or_create_default::<i64>(StorageMode::Disk, "h", Some(pinned.path()))
            .unwrap();
        // no folder means "whatever the storage already uses"
        registry.get_or_create_default::<i64>(StorageMode::Disk, "h", None).unwrap();

        assert_eq!(registry.entries()[0].folder.as_deref(), Some(pinned.path()));
    }

    #[test]
    fn test_folder_switch_rejected() {
        let default = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let registry = StorageRegistry::with_disk_folder(default.path());

        let storage = registry
            .get_or_create_default::<i64>(StorageMode::Disk, "h", None)
            .unwrap();
        storage.store(&key("h", 1), &10).unwrap();

        let err = registry
            .get_or_create_default::<i64>(StorageMode::Disk, "h", Some(other.path()))
            .err().unwrap();
        assert!(matches!(err, Error::InvalidStorageConfiguration(_)));
        assert!(err.to_string().contains("default disk folder"));
        assert!(!other.path().join(disk_dir_name("h")).exists());

        let pinned = TempDir::new().unwrap();
        registry
            .get_or_create_default::<i64>(StorageMode::Disk, "g", Some(pinned.path()))
            .unwrap();
        let err = registry
            .get_or_create_default::<i64>(StorageMode::Disk, "g", Some(other.path()))
            .err().unwrap();
        assert!(err.to_string().contains(&pinned.path().display().to_string()));
    }

    #[test]
    fn test_from_config() {
        let config = MemoConfig::new().default_disk_folder("/srv/memo");
        let registry = StorageRegistry::from_config(&config);
        assert_eq!(registry.default_disk_folder(), Some(PathBuf::from("/srv/memo")));

        registry.clear_default_disk_folder();
        assert_eq!(registry.default_disk_folder(), None);
    }
}
