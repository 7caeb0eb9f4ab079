// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Slot keys and their on-disk layout.

use std::path::{Path, PathBuf};

/// Primary slot: the plaintext `AppState` or the encrypted vault record.
pub const APP_STATE_SLOT: &str = "financial-tracker:app-state:v1";

/// Legacy slot: a bare JSON list of transactions, read only for migration.
pub const LEGACY_TRANSACTIONS_SLOT: &str = "financial-tracker:transactions:v1";

/// Default data directory when `DATA_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = ".financial-tracker";

/// Path utilities for the file-backed slot store.
#[derive(Debug, Clone)]
pub struct SlotPaths {
    root: PathBuf,
}

impl Default for SlotPaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl SlotPaths {
    /// Create a new SlotPaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory holding one file per slot.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name for a slot key. `:` is not portable in file names.
    pub fn file_name(slot: &str) -> String {
        format!("{}.json", slot.replace(':', "_"))
    }

    /// Path to the file holding a slot's value.
    pub fn slot_file(&self, slot: &str) -> PathBuf {
        self.root.join(Self::file_name(slot))
    }

    /// Scratch file written before the atomic rename over `slot_file`.
    pub fn temp_file(&self, slot: &str) -> PathBuf {
        self.slot_file(slot).with_extension("json.tmp")
    }
}
