// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Vault - local-first encrypted storage for a personal finance ledger
//!
//! The ledger (a list of income/expense transactions) is persisted in a
//! string key-value slot store, either as plaintext JSON or, once a vault
//! passphrase is set, as an AES-256-GCM record keyed by PBKDF2-SHA256.
//!
//! ## Modules
//!
//! - `crypto` - Key derivation and authenticated encryption
//! - `encoding` - Base64 text encoding for binary fields
//! - `storage` - Slot stores and the persisted record format
//! - `vault` - Vault manager: enable, unlock, disable, save, load, backup
//! - `session` - Caller-owned handle holding the key and decrypted ledger
//! - `transactions` - Pure transaction CRUD, ordering and coercion
//! - `week`, `insights`, `money` - Week arithmetic, weekly series, amounts

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod insights;
pub mod models;
pub mod money;
pub mod notify;
pub mod session;
pub mod storage;
pub mod transactions;
pub mod vault;
pub mod week;

pub use crypto::SessionKey;
pub use error::{ValidationError, VaultError, VaultResult};
pub use models::{AppState, NewTransaction, Transaction, TransactionPatch, TransactionType};
pub use notify::StorageChange;
pub use session::VaultSession;
pub use storage::{FileSlotStore, MemorySlotStore, SlotPaths, SlotStore};
pub use vault::{VaultManager, VaultStatus};
