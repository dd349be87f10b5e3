//! Per-key computation locks
//!
//! Callers memoizing the same `(callable, key)` pair are serialized so the
//! check, compute and store steps run as one critical section. The table
//! lives next to the storages it guards, so every memoizer sharing a
//! registry waits on the same lock. Different keys never wait on each other.

use memokit_foundation::CacheKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Slot = Arc<Mutex<()>>;

#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    slots: Mutex<HashMap<(String, CacheKey), Slot>>,
}

impl KeyLocks {
    /// Run `f` while holding the lock for `(callable, key)`
    pub(crate) fn with_lock<R>(&self, callable: &str, key: &CacheKey, f: impl FnOnce() -> R) -> R {
        let id = (callable.to_string(), key.clone());
        let slot = self.slots.lock().entry(id.clone()).or_default().clone();

        let result = {
            let _guard = slot.lock();
            f()
        };

        self.release(&id, slot);
        result
    }

    /// Drop the table entry once the last waiter is gone
    fn release(&self, id: &(String, CacheKey), slot: Slot) {
        let mut slots = self.slots.lock();
        // one reference held by the table, one by `slot`
        if Arc::strong_count(&slot) == 2 {
            slots.remove(id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
