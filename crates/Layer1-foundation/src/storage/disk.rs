//! Filesystem-backed storage
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! └── <callable name>-<name digest>/
//!     ├── <digest>.json      {"key": <CacheKey>, "value": <V>}
//!     └── <digest>.1.json    next slot, only on digest collision
//! ```
//!
//! The persisted key is compared on every read, so two keys sharing a
//! digest can never answer for each other. Writes go to a temporary file in
//! the same directory and are renamed into place; a file that fails to parse
//! is logged and treated as absent.
//!
//! ## Root resolution
//!
//! 1. The callable's own folder, fixed at construction
//! 2. The shared [`DiskFolder`], read on every operation
//! 3. The current directory

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::Storage;
use crate::key::CacheKey;
use crate::{Error, Result};

/// Slots tried per digest before giving up
const MAX_SLOTS: usize = 16;

const ENTRY_EXT: &str = "json";

/// Shared, live-updatable default root for disk storages
///
/// Cloning shares the underlying folder, so a change made through any clone
/// is seen by every storage holding one.
#[derive(Debug, Clone, Default)]
pub struct DiskFolder {
    inner: Arc<RwLock<Option<PathBuf>>>,
}

impl DiskFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let folder = Self::new();
        folder.set(path);
        folder
    }

    pub fn get(&self) -> Option<PathBuf> {
        self.inner.read().clone()
    }

    pub fn set(&self, path: impl Into<PathBuf>) {
        *self.inner.write() = Some(path.into());
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[derive(Serialize)]
struct EntryRef<'a, V> {
    key: &'a CacheKey,
    value: &'a V,
}

#[derive(Deserialize)]
struct Entry<V> {
    key: CacheKey,
    value: V,
}

#[derive(Deserialize)]
struct EntryKey {
    key: CacheKey,
}

/// State of one slot for a given key
enum Slot<T> {
    Empty,
    Corrupt,
    Other,
    Match(T),
}

pub struct DiskStorage<V> {
    name: String,
    folder_override: Option<PathBuf>,
    default_folder: DiskFolder,
    _marker: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for DiskStorage<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStorage")
            .field("name", &self.name)
            .field("folder_override", &self.folder_override)
            .field("default_folder", &self.default_folder)
            .finish()
    }
}

impl<V> DiskStorage<V> {
    /// Storage rooted at the shared default folder
    pub fn new(name: impl Into<String>, default_folder: DiskFolder) -> Self {
        Self {
            name: name.into(),
            folder_override: None,
            default_folder,
            _marker: PhantomData,
        }
    }

    /// Storage rooted at a fixed folder, ignoring the shared default
    pub fn with_folder(name: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            folder_override: Some(folder.into()),
            default_folder: DiskFolder::new(),
            _marker: PhantomData,
        }
    }

    pub fn folder_override(&self) -> Option<&Path> {
        self.folder_override.as_deref()
    }

    /// Root folder as of now
    pub fn root(&self) -> PathBuf {
        self.folder_override
            .clone()
            .or_else(|| self.default_folder.get())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Directory holding this callable's entries
    pub fn dir(&self) -> PathBuf {
        self.root().join(disk_dir_name(&self.name))
    }

    fn slot_path(dir: &Path, digest: &str, slot: usize) -> PathBuf {
        if slot == 0 {
            dir.join(format!("{}.{}", digest, ENTRY_EXT))
        } else {
            dir.join(format!("{}.{}.{}", digest, slot, ENTRY_EXT))
        }
    }

    fn read_slot<T, F>(path: &Path, key: &CacheKey, extract: F) -> Slot<T>
    where
        F: FnOnce(BufReader<fs::File>) -> std::result::Result<(CacheKey, T), serde_json::Error>,
    {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Slot::Empty,
            Err(e) => {
                warn!("Cannot open cache entry {}: {}", path.display(), e);
                return Slot::Corrupt;
            }
        };

        match extract(BufReader::new(file)) {
            Ok((stored, value)) if &stored == key => Slot::Match(value),
            Ok(_) => Slot::Other,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                Slot::Corrupt
            }
        }
    }

    /// Path of the slot holding `key`, if any
    fn find(&self, dir: &Path, key: &CacheKey) -> Option<(usize, PathBuf)> {
        let digest = key.digest();
        for slot in 0..MAX_SLOTS {
            let path = Self::slot_path(dir, &digest, slot);
            match Self::read_slot(&path, key, |r| {
                serde_json::from_reader::<_, EntryKey>(r).map(|e| (e.key, ()))
            }) {
                Slot::Empty => return None,
                Slot::Match(()) => return Some((slot, path)),
                Slot::Corrupt | Slot::Other => continue,
            }
        }
        None
    }

    /// Move the last slot of a chain into a freed position
    fn compact(dir: &Path, digest: &str, freed: usize) -> io::Result<()> {
        let mut last = freed;
        while last + 1 < MAX_SLOTS && Self::slot_path(dir, digest, last + 1).exists() {
            last += 1;
        }
        if last > freed {
            fs::rename(
                Self::slot_path(dir, digest, last),
                Self::slot_path(dir, digest, freed),
            )?;
        }
        Ok(())
    }
}

/// Length of the name digest suffix in directory names
const NAME_DIGEST_LEN: usize = 12;

/// Directory name of a callable's entries under the storage root
///
/// The readable part is lossy (`a::b` and `a.b` clean up alike), so a
/// digest of the exact name keeps every callable in its own directory.
pub fn disk_dir_name(callable: &str) -> String {
    let digest = hex::encode(Sha256::digest(callable.as_bytes()));
    format!("{}-{}", readable_name(callable), &digest[..NAME_DIGEST_LEN])
}

fn readable_name(callable: &str) -> String {
    callable
        .replace("::", ".")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl<V> Storage<V> for DiskStorage<V>
where
    V: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.find(&self.dir(), key).is_some()
    }

    fn fetch(&self, key: &CacheKey) -> Result<Option<V>> {
        let dir = self.dir();
        let digest = key.digest();

        for slot in 0..MAX_SLOTS {
            let path = Self::slot_path(&dir, &digest, slot);
            match Self::read_slot(&path, key, |r| {
                serde_json::from_reader::<_, Entry<V>>(r).map(|e| (e.key, e.value))
            }) {
                Slot::Empty => return Ok(None),
                Slot::Match(value) => return Ok(Some(value)),
                Slot::Corrupt | Slot::Other => continue,
            }
        }
        Ok(None)
    }

    fn store(&self, key: &CacheKey, value: &V) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|e| Error::storage_unavailable(&dir, e))?;

        let digest = key.digest();
        let target = match self.find(&dir, key) {
            Some((_, path)) => path,
            None => (0..MAX_SLOTS)
                .map(|slot| Self::slot_path(&dir, &digest, slot))
                .find(|path| {
                    !matches!(
                        Self::read_slot(path, key, |r| {
                            serde_json::from_reader::<_, EntryKey>(r).map(|e| (e.key, ()))
                        }),
                        Slot::Other
                    )
                })
                .ok_or_else(|| {
                    Error::storage_unavailable(&dir, format!("no free slot for digest {}", digest))
                })?,
        };

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::storage_unavailable(&dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &EntryRef { key, value })?;
            writer.flush()?;
        }
        tmp.persist(&target)
            .map_err(|e| Error::storage_unavailable(&target, e.error))?;

        debug!("Stored cache entry {}", target.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let dir = self.dir();
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_unavailable(&dir, e)),
        }
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        let dir = self.dir();
        let Some((slot, path)) = self.find(&dir, key) else {
            return Ok(false);
        };

        fs::remove_file(&path).map_err(|e| Error::storage_unavailable(&path, e))?;
        Self::compact(&dir, &key.digest(), slot)
            .map_err(|e| Error::storage_unavailable(&dir, e))?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        let dir = self.dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                warn!("Cannot list cache directory {}: {}", dir.display(), e);
                return Ok(Vec::new());
            }
        };

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            let parsed = fs::File::open(&path)
                .map_err(serde_json::Error::io)
                .and_then(|f| serde_json::from_reader::<_, EntryKey>(BufReader::new(f)));
            match parsed {
                Ok(e) if e.key.callable() == self.name => keys.push(e.key),
                Ok(e) => debug!("Skipping entry of {} in {}", e.key.callable(), dir.display()),
                Err(e) => warn!("Ignoring unreadable cache entry {}: {}", path.display(), e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
