//! Local persistence of the synthesized clip.
//!
//! There is exactly one slot on disk.  Every [`AudioStore::store`] replaces
//! it; the replacement is a temp-file write followed by a rename inside the
//! same directory, so a reader sees either the previous clip or the new one,
//! never a partial file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::StorageConfig;

// ---------------------------------------------------------------------------
// StorageRef
// ---------------------------------------------------------------------------

/// Stable reference to the persisted clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRef(PathBuf);

impl StorageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Read the referenced bytes back.
    pub fn read(&self) -> Result<Vec<u8>, StorageError> {
        std::fs::read(&self.0).map_err(|source| StorageError::Read {
            path: self.0.clone(),
            source,
        })
    }
}

impl std::fmt::Display for StorageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot create audio cache directory {}: {source}", dir.display())]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write audio artifact: {0}")]
    Write(#[from] std::io::Error),

    #[error("cannot replace audio artifact {}: {source}", path.display())]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read audio artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The blocking write task panicked or was aborted.
    #[error("audio cache task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// AudioStore trait
// ---------------------------------------------------------------------------

/// Blocking persistence interface.  The orchestrator calls it from
/// `spawn_blocking`.
pub trait AudioStore: Send + Sync {
    fn store(&self, bytes: &[u8]) -> Result<StorageRef, StorageError>;
}

// ---------------------------------------------------------------------------
// AudioCache
// ---------------------------------------------------------------------------

/// Single-slot file cache.
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    file_name: String,
}

impl AudioCache {
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.resolved_dir(), config.file_name.clone())
    }

    /// Reference to the slot, whether or not anything has been written yet.
    pub fn slot(&self) -> StorageRef {
        StorageRef::new(self.dir.join(&self.file_name))
    }
}

impl AudioStore for AudioCache {
    fn store(&self, bytes: &[u8]) -> Result<StorageRef, StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            dir: self.dir.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        let slot = self.slot();
        tmp.persist(slot.path())
            .map_err(|e| StorageError::Replace {
                path: slot.path().to_path_buf(),
                source: e.error,
            })?;

        log::info!("cache: wrote {} bytes to {slot}", bytes.len());
        Ok(slot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
