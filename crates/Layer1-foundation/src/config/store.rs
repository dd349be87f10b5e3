//! Location of one `memokit.json` and its reader / writer

use crate::config::{MemoConfig, MEMOKIT_CONFIG_FILE};
use crate::{Error, Result};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// One config file on disk
///
/// Absent files are not an error; they simply contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/memokit/memokit.json`
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("no per-user config directory on this platform".to_string()))?;
        Ok(Self::at(dir.join("memokit").join(MEMOKIT_CONFIG_FILE)))
    }

    /// `<root>/.memokit/memokit.json`
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join(".memokit").join(MEMOKIT_CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed contents, `Ok(None)` when the file does not exist
    pub fn read(&self) -> Result<Option<MemoConfig>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error("read", e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| self.error("parse", e))
    }

    /// Replace the file with `config`, creating parent directories
    ///
    /// Written through a temporary sibling so readers never see a
    /// half-written file.
    pub fn write(&self, config: &MemoConfig) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Config(format!("{} has no parent directory", self.path.display())))?;
        std::fs::create_dir_all(dir).map_err(|e| self.error("create directory for", e))?;

        let content = serde_json::to_vec_pretty(config).map_err(|e| self.error("serialize", e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.error("write", e))?;
        tmp.write_all(&content).map_err(|e| self.error("write", e))?;
        tmp.persist(&self.path).map_err(|e| self.error("write", e.error))?;
        Ok(())
    }

    fn error(&self, action: &str, err: impl std::fmt::Display) -> Error {
        Error::Config(format!("failed to {} {}: {}", action, self.path.display(), err))
    }
}
