//! Storage backend contract

use crate::key::CacheKey;
use crate::Result;

/// Pluggable result store bound to one memoized callable
///
/// Implementations must be thread-safe. Individual operations are atomic,
/// but a `contains`/`fetch`/`store` sequence is not; callers needing
/// at-most-one computation per key serialize on the key first (the
/// memoizer does).
///
/// # Contract
///
/// - `fetch` returns `Ok(None)` for absent keys instead of failing
/// - `keys` is a snapshot, not a live view
/// - `remove` reports whether anything was deleted
pub trait Storage<V>: Send + Sync {
    /// Qualified name of the callable this storage belongs to
    fn name(&self) -> &str;

    fn contains(&self, key: &CacheKey) -> bool;

    fn fetch(&self, key: &CacheKey) -> Result<Option<V>>;

    fn store(&self, key: &CacheKey, value: &V) -> Result<()>;

    /// Drop every entry
    fn clear(&self) -> Result<()>;

    fn remove(&self, key: &CacheKey) -> Result<bool>;

    fn keys(&self) -> Result<Vec<CacheKey>>;

    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether `store` keeps what it is given
    ///
    /// Pass-through storages return `false` so their writes are not
    /// counted as stores.
    fn persists(&self) -> bool {
        true
    }
}

/// Whether a lookup was answered from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

impl Lookup {
    pub fn is_hit(self) -> bool {
        matches!(self, Lookup::Hit)
    }
}

/// Read-through access on top of the raw contract
pub trait StorageExt<V>: Storage<V> {
    /// Return the stored value for `key`, or compute it
    ///
    /// The computed value is written back only when `write` is set.
    fn get_or_insert_with<F>(&self, key: &CacheKey, write: bool, compute: F) -> Result<(V, Lookup)>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.fetch(key)? {
            return Ok((value, Lookup::Hit));
        }

        let value = compute()?;
        if write {
            self.store(key, &value)?;
        }
        Ok((value, Lookup::Miss))
    }
}

impl<V, S: Storage<V> + ?Sized> StorageExt<V> for S {}
