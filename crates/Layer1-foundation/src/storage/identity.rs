//! Storage that keeps nothing
//!
//! Callables backed by it run on every call but still hand out tracked
//! results, so their dependency chain shows up in downstream keys.

use std::marker::PhantomData;

use super::Storage;
use crate::key::CacheKey;
use crate::Result;

#[derive(Debug)]
pub struct IdentityStorage<V> {
    name: String,
    _marker: PhantomData<fn() -> V>,
}

impl<V> IdentityStorage<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

impl<V> Storage<V> for IdentityStorage<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, _key: &CacheKey) -> bool {
        false
    }

    fn fetch(&self, _key: &CacheKey) -> Result<Option<V>> {
        Ok(None)
    }

    fn store(&self, _key: &CacheKey, _value: &V) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &CacheKey) -> Result<bool> {
        Ok(false)
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(Vec::new())
    }

    fn persists(&self) -> bool {
        false
    }
}
