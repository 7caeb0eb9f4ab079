// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Slot store backends.
//!
//! The vault only needs a string-keyed, string-valued store. Two backends are
//! provided:
//!
//! - [`FileSlotStore`]: one file per slot under a data directory, written via
//!   temp file + rename so a half-written record is never observable
//! - [`MemorySlotStore`]: a process-local map, used by tests and embedders
//!   that persist elsewhere

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use super::SlotPaths;

/// Error type for slot store operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// Storage not initialized
    NotInitialized,
    /// A previous writer panicked while holding the store lock
    Poisoned,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
            StorageError::Poisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Host-provided key-value store with string keys and string values.
pub trait SlotStore: Send + Sync {
    /// Read a slot. `Ok(None)` when the slot has never been written.
    fn get(&self, slot: &str) -> StorageResult<Option<String>>;

    /// Overwrite a slot.
    fn set(&self, slot: &str, value: &str) -> StorageResult<()>;

    /// Delete a slot. Deleting an absent slot is not an error.
    fn remove(&self, slot: &str) -> StorageResult<()>;
}

// =============================================================================
// File Backend
// =============================================================================

/// File-backed slot store.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    paths: SlotPaths,
    initialized: bool,
}

impl FileSlotStore {
    /// Create a new store. Call `initialize()` before use.
    pub fn new(paths: SlotPaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Create and initialize a store rooted at `paths`.
    pub fn open(paths: SlotPaths) -> StorageResult<Self> {
        let mut store = Self::new(paths);
        store.initialize()?;
        Ok(store)
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &SlotPaths {
        &self.paths
    }

    /// Create the data directory. Idempotent.
    ///
    /// On Unix the directory is restricted to the owner.
    pub fn initialize(&mut self) -> StorageResult<()> {
        let root = self.paths.root();
        if !root.exists() {
            fs::create_dir_all(root)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(root, fs::Permissions::from_mode(0o700))?;
            }
        }

        self.initialized = true;
        Ok(())
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }
}

impl SlotStore for FileSlotStore {
    fn get(&self, slot: &str) -> StorageResult<Option<String>> {
        self.ensure_initialized()?;

        match fs::read_to_string(self.paths.slot_file(slot)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, slot: &str, value: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = self.paths.slot_file(slot);

        // Write to temp file first, then rename for atomicity
        let temp_path = self.paths.temp_file(slot);
        let written = write_synced(&temp_path, value.as_bytes())
            .and_then(|()| fs::rename(&temp_path, &path));

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(slot, error = %cleanup, "Failed to remove temp slot file");
                }
            }
            return Err(e.into());
        }

        tracing::debug!(slot, "Slot written");
        Ok(())
    }

    fn remove(&self, slot: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        match fs::remove_file(self.paths.slot_file(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

// =============================================================================
// Memory Backend
// =============================================================================

/// In-memory slot store.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, slot: &str) -> StorageResult<Option<String>> {
        let slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> StorageResult<()> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> StorageResult<()> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.remove(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{APP_STATE_SLOT, LEGACY_TRANSACTIONS_SLOT};

    fn test_store() -> (tempfile::TempDir, FileSlotStore) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileSlotStore::open(SlotPaths::new(dir.path().join("data")))
            .expect("Failed to initialize test storage");
        (dir, store)
    }

    #[test]
    fn initialize_creates_directory() {
        let (_dir, store) = test_store();
        assert!(store.paths().root().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn data_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = test_store();
        let mode = fs::metadata(store.paths().root()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn write_and_read_slot() {
        let (_dir, store) = test_store();
        assert_eq!(store.get(APP_STATE_SLOT).unwrap(), None);

        store.set(APP_STATE_SLOT, r#"{"transactions":[]}"#).unwrap();
        assert_eq!(
            store.get(APP_STATE_SLOT).unwrap().as_deref(),
            Some(r#"{"transactions":[]}"#)
        );

        store.set(APP_STATE_SLOT, "second").unwrap();
        assert_eq!(store.get(APP_STATE_SLOT).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn write_leaves_no_temp_file() {
        let (_dir, store) = test_store();
        store.set(APP_STATE_SLOT, "value").unwrap();
        assert!(store.paths().slot_file(APP_STATE_SLOT).exists());
        assert!(!store.paths().temp_file(APP_STATE_SLOT).exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let (_dir, store) = test_store();
        // A directory in the slot's place makes the final rename fail.
        fs::create_dir(store.paths().slot_file(APP_STATE_SLOT)).unwrap();
        fs::write(
            store.paths().slot_file(APP_STATE_SLOT).join("occupied"),
            "x",
        )
        .unwrap();

        assert!(matches!(
            store.set(APP_STATE_SLOT, "value"),
            Err(StorageError::Io(_))
        ));
        assert!(!store.paths().temp_file(APP_STATE_SLOT).exists());
    }

    #[test]
    fn slots_are_independent() {
        let (_dir, store) = test_store();
        store.set(APP_STATE_SLOT, "a").unwrap();
        store.set(LEGACY_TRANSACTIONS_SLOT, "b").unwrap();

        store.remove(APP_STATE_SLOT).unwrap();
        assert_eq!(store.get(APP_STATE_SLOT).unwrap(), None);
        assert_eq!(store.get(LEGACY_TRANSACTIONS_SLOT).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn removing_absent_slot_is_ok() {
        let (_dir, store) = test_store();
        store.remove(APP_STATE_SLOT).unwrap();
    }

    #[test]
    fn uninitialized_storage_returns_error() {
        let store = FileSlotStore::new(SlotPaths::new("/tmp/never-init"));
        assert!(matches!(
            store.get(APP_STATE_SLOT),
            Err(StorageError::NotInitialized)
        ));
        assert!(matches!(
            store.set(APP_STATE_SLOT, "x"),
            Err(StorageError::NotInitialized)
        ));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemorySlotStore::new();
        assert!(store.is_empty());

        store.set(APP_STATE_SLOT, "v").unwrap();
        assert_eq!(store.get(APP_STATE_SLOT).unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);

        store.remove(APP_STATE_SLOT).unwrap();
        store.remove(APP_STATE_SLOT).unwrap();
        assert!(store.is_empty());
    }
}
