//! Per-callable hit / miss counters

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one memoized callable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses whose result was written back
    pub stores: u64,
    /// Failed invocations (binding, storage or body errors)
    pub errors: u64,
}

impl MemoStats {
    pub fn calls(&self) -> u64 {
        self.hits + self.misses + self.errors
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Event {
    Hit,
    Miss { stored: bool },
    Error,
}

#[derive(Debug, Default)]
pub(crate) struct StatsTable {
    by_name: Mutex<HashMap<String, MemoStats>>,
}

impl StatsTable {
    pub(crate) fn record(&self, name: &str, event: Event) {
        let mut table = self.by_name.lock();
        let stats = match table.get_mut(name) {
            Some(stats) => stats,
            None => table.entry(name.to_string()).or_default(),
        };

        match event {
            Event::Hit => stats.hits += 1,
            Event::Miss { stored } => {
                stats.misses += 1;
                if stored {
                    stats.stores += 1;
                }
            }
            Event::Error => stats.errors += 1,
        }
    }

    pub(crate) fn get(&self, name: &str) -> MemoStats {
        self.by_name.lock().get(name).copied().unwrap_or_default()
    }

    pub(crate) fn reset(&self) {
        self.by_name.lock().clear();
    }
}
