//! Storage backends for memoized results
//!
//! - `memory`: in-process table
//! - `disk`: one JSON file per key under a (live-resolvable) root folder
//! - `identity`: stores nothing, only takes part in result tracking
//!
//! Custom backends implement [`Storage`] directly.

mod disk;
mod identity;
mod memory;
mod traits;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use disk::{disk_dir_name, DiskFolder, DiskStorage};
pub use identity::IdentityStorage;
pub use memory::MemoryStorage;
pub use traits::{Lookup, Storage, StorageExt};

use crate::Error;

/// Family of backend a callable's storage belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Memory,
    Disk,
    Identity,
    Custom,
}

impl StorageMode {
    pub const ALL: [StorageMode; 4] = [
        StorageMode::Memory,
        StorageMode::Disk,
        StorageMode::Identity,
        StorageMode::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Memory => "memory",
            StorageMode::Disk => "disk",
            StorageMode::Identity => "identity",
            StorageMode::Custom => "custom",
        }
    }
}

impl Default for StorageMode {
    fn default() -> Self {
        StorageMode::Memory
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageMode::Memory),
            "disk" => Ok(StorageMode::Disk),
            "identity" => Ok(StorageMode::Identity),
            "custom" => Ok(StorageMode::Custom),
            other => Err(Error::Config(format!("unknown storage mode '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_roundtrip() {
        for mode in StorageMode::ALL {
            assert_eq!(mode.to_string().parse::<StorageMode>().unwrap(), mode);
        }
        assert_eq!(" Disk ".parse::<StorageMode>().unwrap(), StorageMode::Disk);
        assert!("redis".parse::<StorageMode>().is_err());
    }

    #[test]
    fn test_mode_serde_lowercase() {
        assert_eq!(serde_json::to_string(&StorageMode::Identity).unwrap(), "\"identity\"");
        let mode: StorageMode = serde_json::from_str("\"custom\"").unwrap();
        assert_eq!(mode, StorageMode::Custom);
    }
}
