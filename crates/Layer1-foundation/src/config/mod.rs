//! Config - memoization settings
//!
//! - `store.rs` - [`ConfigFile`], one `memokit.json` location
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. `<config dir>/memokit/memokit.json`
//! 3. `./.memokit/memokit.json`
//! 4. `MEMOKIT_DISK_FOLDER`, `MEMOKIT_MODE`, `MEMOKIT_READONLY`

mod store;

pub use store::ConfigFile;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::storage::StorageMode;
use crate::{Error, Result};

/// Config file name
pub const MEMOKIT_CONFIG_FILE: &str = "memokit.json";

pub const ENV_DISK_FOLDER: &str = "MEMOKIT_DISK_FOLDER";
pub const ENV_MODE: &str = "MEMOKIT_MODE";
pub const ENV_READONLY: &str = "MEMOKIT_READONLY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Mode used when a callable does not pick one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<StorageMode>,

    /// Root folder for disk storages without their own folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_disk_folder: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
}

fn default_version() -> u32 {
    1
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_mode: None,
            default_disk_folder: None,
            readonly: None,
        }
    }
}

impl MemoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Global + project + environment
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(global) = ConfigFile::global() {
            if let Some(global_config) = global.read()? {
                config.merge(global_config);
            }
        }

        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("cannot determine current directory: {}", e)))?;
        if let Some(project_config) = ConfigFile::project(cwd).read()? {
            config.merge(project_config);
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        debug!(?config, "Loaded memokit config");
        Ok(config)
    }

    /// Project file only, no environment
    pub fn load_project(root: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::new();
        if let Some(project_config) = ConfigFile::project(root).read()? {
            config.merge(project_config);
        }
        Ok(config)
    }

    pub fn save_project(&self, root: impl AsRef<Path>) -> Result<()> {
        ConfigFile::project(root).write(self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Merge another config in (`other` wins where set)
    pub fn merge(&mut self, other: MemoConfig) {
        self.version = self.version.max(other.version);
        if other.default_mode.is_some() {
            self.default_mode = other.default_mode;
        }
        if other.default_disk_folder.is_some() {
            self.default_disk_folder = other.default_disk_folder;
        }
        if other.readonly.is_some() {
            self.readonly = other.readonly;
        }
    }

    /// Overlay environment variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(folder) = lookup(ENV_DISK_FOLDER).filter(|v| !v.is_empty()) {
            self.default_disk_folder = Some(PathBuf::from(folder));
        }
        if let Some(mode) = lookup(ENV_MODE).filter(|v| !v.is_empty()) {
            self.default_mode = Some(mode.parse()?);
        }
        if let Some(flag) = lookup(ENV_READONLY).filter(|v| !v.is_empty()) {
            self.readonly = Some(parse_bool(ENV_READONLY, &flag)?);
        }
        Ok(())
    }

    // ========================================================================
    // Resolved values
    // ========================================================================

    pub fn mode(&self) -> StorageMode {
        self.default_mode.unwrap_or_default()
    }

    pub fn disk_folder(&self) -> Option<&Path> {
        self.default_disk_folder.as_deref()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.unwrap_or(false)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn default_mode(mut self, mode: StorageMode) -> Self {
        self.default_mode = Some(mode);
        self
    }

    pub fn default_disk_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.default_disk_folder = Some(folder.into());
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = Some(readonly);
        self
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got '{}'", name, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MemoConfig::new();
        assert_eq!(config.version, 1);
        assert_eq!(config.mode(), StorageMode::Memory);
        assert_eq!(config.disk_folder(), None);
        assert!(!config.is_readonly());
    }

    #[test]
    fn test_default_is_current_version() {
        let config = MemoConfig::default();
        assert_eq!(config.version, 1);
        assert_eq!(config, MemoConfig::new());

        let mut older = MemoConfig::default();
        older.merge(MemoConfig::default().readonly(true));
        assert_eq!(older.version, 1);
    }

    #[test]
    fn test_merge_other_wins_where_set() {
        let mut base = MemoConfig::new()
            .default_mode(StorageMode::Disk)
            .default_disk_folder("/var/cache/a");
        base.merge(MemoConfig::new().readonly(true));

        assert_eq!(base.mode(), StorageMode::Disk);
        assert_eq!(base.disk_folder(), Some(Path::new("/var/cache/a")));
        assert!(base.is_readonly());

        base.merge(MemoConfig::new().default_disk_folder("/var/cache/b"));
        assert_eq!(base.disk_folder(), Some(Path::new("/var/cache/b")));
    }

    #[test]
    fn test_apply_env() {
        let env: HashMap<&str, &str> = [
            (ENV_DISK_FOLDER, "/tmp/memo"),
            (ENV_MODE, "disk"),
            (ENV_READONLY, "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = MemoConfig::new();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.mode(), StorageMode::Disk);
        assert_eq!(config.disk_folder(), Some(Path::new("/tmp/memo")));
        assert!(config.is_readonly());
    }

    #[test]
    fn test_apply_env_rejects_garbage() {
        let mut config = MemoConfig::new();
        let err = config
            .apply_env(|name| (name == ENV_READONLY).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_project_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let config = MemoConfig::new()
            .default_mode(StorageMode::Identity)
            .default_disk_folder(tmp.path().join("cache"));
        config.save_project(tmp.path()).unwrap();

        assert_eq!(MemoConfig::load_project(tmp.path()).unwrap(), config);
    }

    #[test]
    fn test_camel_case_file_format() {
        let config: MemoConfig =
            serde_json::from_str(r#"{"defaultMode": "disk", "defaultDiskFolder": "/c"}"#).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.mode(), StorageMode::Disk);
        assert_eq!(config.disk_folder(), Some(Path::new("/c")));
    }
}
