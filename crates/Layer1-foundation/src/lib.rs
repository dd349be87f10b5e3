//! # memokit-foundation
//!
//! Foundation layer for memokit:
//! - Key: argument binding and normalization into [`CacheKey`]
//! - Tracked: results that carry the key that produced them
//! - Storage: the [`Storage`] contract plus Memory, Disk and Identity backends
//! - Config: [`MemoConfig`] (file + environment)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  call (positional / keyword ArgValues)                  │
//! │                     │                                   │
//! │                     ▼                                   │
//! │   build_key ── Signature (params + defaults)            │
//! │                     │  Tracked args → origin key        │
//! │                     ▼                                   │
//! │               CacheKey                                  │
//! │                     │                                   │
//! │          ┌──────────┼──────────┐                        │
//! │          ▼          ▼          ▼                        │
//! │       Memory      Disk      Identity   (+ custom)       │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod storage;
pub mod tracked;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Key
// ============================================================================
pub use key::{
    build_key, key_digest, ArgValue, CacheKey, CallArgs, NormalizedValue, Param, Signature,
};

// ============================================================================
// Tracked
// ============================================================================
pub use tracked::{element_origin, Split, Tracked};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{
    disk_dir_name, DiskFolder, DiskStorage, IdentityStorage, Lookup, MemoryStorage, Storage, StorageExt,
    StorageMode,
};

// ============================================================================
// Config
// ============================================================================
pub use config::{ConfigFile, MemoConfig, MEMOKIT_CONFIG_FILE};
