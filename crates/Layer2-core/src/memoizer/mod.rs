//! # Memoizer
//!
//! Orchestrates one memoized call:
//!
//! 1. resolve the callable's storage from the [`StorageRegistry`]
//!    (created lazily on first use)
//! 2. bind the call arguments into a [`CacheKey`]
//! 3. under the registry's per-key lock, answer from storage or run the body and
//!    store its result (unless readonly)
//! 4. hand the result back as a [`Tracked`] value carrying its key, so
//!    downstream memoized calls substitute the key instead of re-hashing
//!    the value
//!
//! ```rust,ignore
//! let memo = Memoizer::new(Arc::new(StorageRegistry::new()));
//! let add = memo.memoize(
//!     Signature::new("math::add").param("a").param_default("b", 10),
//!     MemoOptions::memory(),
//! );
//!
//! let sum = add.call(&CallArgs::new().arg(5), || 5 + 10)?;
//! let again = add.call(&CallArgs::new().kwarg("a", 5).kwarg("b", 10), || unreachable!())?;
//! assert_eq!(*sum, *again);
//! ```

mod options;
mod stats;

pub use options::MemoOptions;
pub use stats::MemoStats;

use memokit_foundation::{
    build_key, CacheKey, CallArgs, Error, Lookup, MemoConfig, Result, Signature, Storage,
    StorageExt, StorageMode, Tracked,
};
use stats::{Event, StatsTable};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::{MemoValue, StorageRegistry};

/// Entry point for memoized calls
///
/// Cheap to share behind an `Arc`; all state is internally synchronized.
#[derive(Debug)]
pub struct Memoizer {
    registry: Arc<StorageRegistry>,
    stats: StatsTable,
}

impl Memoizer {
    pub fn new(registry: Arc<StorageRegistry>) -> Self {
        Self {
            registry,
            stats: StatsTable::default(),
        }
    }

    /// Memoizer over a fresh registry seeded from `config`
    pub fn from_config(config: &MemoConfig) -> Self {
        Self::new(Arc::new(StorageRegistry::from_config(config)))
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    // ========================================================================
    // Storage resolution
    // ========================================================================

    /// Storage backing callable `name` under `options`
    ///
    /// A custom storage in `options` is registered under
    /// `(Custom, name)`, replacing whatever was registered there before.
    /// Custom mode without a storage reuses a registered one.
    pub fn storage_for<V: MemoValue>(&self, name: &str, options: &MemoOptions<V>) -> Result<Arc<dyn Storage<V>>> {
        let mode = options.mode();

        if options.folder().is_some() && mode != StorageMode::Disk {
            return Err(Error::InvalidStorageConfiguration(format!(
                "cache folder given for {} storage '{}'; only disk storages take a folder",
                mode, name
            )));
        }

        if let Some(storage) = options.storage() {
            if mode != StorageMode::Custom {
                return Err(Error::InvalidStorageConfiguration(format!(
                    "custom storage given for '{}' in {} mode",
                    name, mode
                )));
            }
            if let Some(current) = self.registry.get::<V>(mode, name)? {
                if same_storage(&current, storage) {
                    return Ok(current);
                }
            }
            self.registry.register(mode, name, storage.clone());
            return Ok(storage.clone());
        }

        if mode == StorageMode::Custom {
            return self.registry.get::<V>(mode, name)?.ok_or_else(|| {
                Error::InvalidStorageConfiguration(format!(
                    "custom mode for '{}' requires a storage implementation",
                    name
                ))
            });
        }

        self.registry.get_or_create_default(mode, name, options.folder())
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Memoized call of an infallible body
    pub fn invoke<V, F>(
        &self,
        signature: &Signature,
        args: &CallArgs,
        options: &MemoOptions<V>,
        body: F,
    ) -> Result<Tracked<V>>
    where
        V: MemoValue,
        F: FnOnce() -> V,
    {
        self.try_invoke(signature, args, options, || Ok::<V, Infallible>(body()))
    }

    /// Memoized call of a fallible body
    ///
    /// A body error surfaces as [`Error::Computation`] and nothing is
    /// stored for the key.
    pub fn try_invoke<V, E, F>(
        &self,
        signature: &Signature,
        args: &CallArgs,
        options: &MemoOptions<V>,
        body: F,
    ) -> Result<Tracked<V>>
    where
        V: MemoValue,
        E: Into<anyhow::Error>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        let name = signature.name();
        let result = self.run(signature, args, options, body);

        if let Err(ref err) = result {
            if err.is_storage_error() {
                warn!(callable = name, error = %err, "Memoized call failed");
            } else {
                debug!(callable = name, error = %err, "Memoized call failed");
            }
            self.stats.record(name, Event::Error);
        }
        result
    }

    fn run<V, E, F>(
        &self,
        signature: &Signature,
        args: &CallArgs,
        options: &MemoOptions<V>,
        body: F,
    ) -> Result<Tracked<V>>
    where
        V: MemoValue,
        E: Into<anyhow::Error>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        let name = signature.name();
        let storage = self.storage_for(name, options)?;
        let key = build_key(signature, args)?;
        let write = !options.is_readonly();

        let (value, lookup) = self.registry.with_key_lock(name, &key, || {
            storage.get_or_insert_with(&key, write, || body().map_err(|e| Error::Computation(e.into())))
        })?;

        match lookup {
            Lookup::Hit => {
                debug!(callable = name, %key, "Cache hit");
                self.stats.record(name, Event::Hit);
            }
            Lookup::Miss => {
                let stored = write && storage.persists();
                debug!(callable = name, %key, stored, "Cache miss");
                self.stats.record(name, Event::Miss { stored });
            }
        }

        Ok(Tracked::new(value, key))
    }

    /// Reusable handle for one callable
    pub fn memoize<V: MemoValue>(&self, signature: Signature, options: MemoOptions<V>) -> MemoFn<'_, V> {
        MemoFn {
            memoizer: self,
            signature,
            options,
        }
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self, name: &str) -> MemoStats {
        self.stats.get(name)
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

fn same_storage<V>(a: &Arc<dyn Storage<V>>, b: &Arc<dyn Storage<V>>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// A callable bound to its signature and options
pub struct MemoFn<'m, V> {
    memoizer: &'m Memoizer,
    signature: Signature,
    options: MemoOptions<V>,
}

impl<'m, V: MemoValue> MemoFn<'m, V> {
    pub fn call<F>(&self, args: &CallArgs, body: F) -> Result<Tracked<V>>
    where
        F: FnOnce() -> V,
    {
        self.memoizer.invoke(&self.signature, args, &self.options, body)
    }

    pub fn try_call<E, F>(&self, args: &CallArgs, body: F) -> Result<Tracked<V>>
    where
        E: Into<anyhow::Error>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        self.memoizer.try_invoke(&self.signature, args, &self.options, body)
    }

    /// Key a call with `args` would use, without running anything
    pub fn key(&self, args: &CallArgs) -> Result<CacheKey> {
        build_key(&self.signature, args)
    }

    pub fn storage(&self) -> Result<Arc<dyn Storage<V>>> {
        self.memoizer.storage_for(self.signature.name(), &self.options)
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn options(&self) -> &MemoOptions<V> {
        &self.options
    }

    pub fn stats(&self) -> MemoStats {
        self.memoizer.stats(self.name())
    }
}

impl<V> std::fmt::Debug for MemoFn<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoFn")
            .field("signature", &self.signature)
            .field("options", &self.options)
            .finish()
    }
}
