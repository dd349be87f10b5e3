//! In-process storage
//!
//! Unbounded table that lives as long as the storage object. There is no
//! eviction; entries leave only through `remove` or `clear`.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::Storage;
use crate::key::CacheKey;
use crate::Result;

#[derive(Debug)]
pub struct MemoryStorage<V> {
    name: String,
    entries: RwLock<HashMap<CacheKey, V>>,
}

impl<V> MemoryStorage<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Storage<V> for MemoryStorage<V>
where
    V: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    fn fetch(&self, key: &CacheKey) -> Result<Option<V>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn store(&self, key: &CacheKey, value: &V) -> Result<()> {
        self.entries.write().insert(key.clone(), value.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}
