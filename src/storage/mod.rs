// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Slot Storage Module
//!
//! Persistence for the ledger lives in a host-provided key-value store with
//! string keys and string values ("slots"). Exactly two slots are used:
//!
//! ```text
//! financial-tracker:app-state:v1      # AppState JSON or VaultRecord JSON
//! financial-tracker:transactions:v1   # legacy bare transaction list (read-only)
//! ```
//!
//! ## Security Model
//!
//! - The slot store itself provides no confidentiality
//! - When the vault is enabled the primary slot only ever holds ciphertext
//! - The legacy slot is deleted as soon as a vault is enabled
//!
//! The file backend maps each slot to `<DATA_DIR>/<slot>.json` and writes
//! through a temp file + rename, so readers never see a partial record.

pub mod backend;
pub mod paths;
pub mod record;

pub use backend::{FileSlotStore, MemorySlotStore, SlotStore, StorageError, StorageResult};
pub use paths::{SlotPaths, APP_STATE_SLOT, DEFAULT_DATA_DIR, LEGACY_TRANSACTIONS_SLOT};
pub use record::{
    app_state_from_value, read_legacy_transactions, CipherRecord, KdfRecord, StorageRecord,
    VaultRecord, VAULT_RECORD_VERSION,
};
