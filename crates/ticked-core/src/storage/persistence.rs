//! Replica persistence
//!
//! Handles saving and loading replica files to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) to prevent
//! corruption.
//!
//! Storage location: `~/.local/share/ticked/` (configurable via `Config`)
//!
//! Files:
//! - `replica-<name>.json` - The replicated namespace plus pending mutations
//! - `token` - The session bearer token

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::replica::Replica;
use crate::storage::error::{StorageError, StorageResult};

/// Persistence layer for replica files
///
/// Provides atomic file operations for saving/loading one named replica.
#[derive(Debug)]
pub struct ReplicaPersistence {
    path: PathBuf,
}

impl ReplicaPersistence {
    /// Create a persistence handler for a replica file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the replica file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a replica exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Save a replica to disk using atomic write
    pub fn save(&self, replica: &Replica) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(replica).map_err(|e| StorageError::InvalidFormat {
            path: self.path.clone(),
            details: e.to_string(),
        })?;

        atomic_write(&self.path, &json)
    }

    /// Load a replica from disk
    ///
    /// Returns `None` if the replica file doesn't exist.
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load(&self) -> StorageResult<Option<Replica>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| StorageError::ReadError {
            path: self.path.clone(),
            source: e,
        })?;

        let replica =
            serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        Ok(Some(replica))
    }

    /// Load an existing replica or create a new empty one
    ///
    /// A newly created replica is saved immediately so the client id is
    /// stable across restarts.
    pub fn load_or_create(&self) -> StorageResult<Replica> {
        if let Some(replica) = self.load()? {
            return Ok(replica);
        }

        let replica = Replica::new();
        self.save(&replica)?;
        Ok(replica)
    }

    /// Delete the replica file
    pub fn delete(&self) -> StorageResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| StorageError::from_io(e, self.path.clone()))?;
        }
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    // Create temp file in the same directory (for atomic rename)
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    // Sync to disk before rename
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
