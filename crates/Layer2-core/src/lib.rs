//! memokit-core: memoization runtime
//!
//! Layer2 - builds on the key, storage and config primitives of
//! `memokit-foundation`.
//!
//! # Modules
//!
//! - `registry`: [`StorageRegistry`], one storage per `(mode, callable)`
//! - `memoizer`: [`Memoizer`], [`MemoFn`] handles and per-callable stats
//!
//! # Example
//!
//! ```ignore
//! use memokit_core::{CallArgs, MemoOptions, Memoizer, Signature, StorageRegistry};
//!
//! let registry = Arc::new(StorageRegistry::new());
//! registry.set_default_disk_folder("/var/cache/pipeline");
//! let memo = Memoizer::new(registry);
//!
//! let load = memo.memoize(Signature::new("pipeline::load").param("path"), MemoOptions::disk());
//! let scale = memo.memoize(
//!     Signature::new("pipeline::scale").param("frame").param_default("factor", 2),
//!     MemoOptions::memory(),
//! );
//!
//! let frame = load.call(&CallArgs::new().arg("in.raw"), || read_frame("in.raw"))?;
//! // keyed on `pipeline::load(path="in.raw")`, not on the frame's bytes
//! let scaled = scale.call(&CallArgs::new().arg(&frame), || frame.scaled(2))?;
//! ```

pub mod memoizer;
pub mod registry;

// Re-exports: Memoizer
pub use memoizer::{MemoFn, MemoOptions, MemoStats, Memoizer};

// Re-exports: Registry
pub use registry::{EntryInfo, MemoValue, StorageRegistry};

// Re-exports: Layer1
pub use memokit_foundation::{
    build_key, disk_dir_name, element_origin, ArgValue, CacheKey, CallArgs, DiskFolder,
    DiskStorage, Error, IdentityStorage, Lookup, MemoConfig, MemoryStorage, NormalizedValue,
    Result, Signature, Split, Storage, StorageExt, StorageMode, Tracked,
};
