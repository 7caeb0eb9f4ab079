// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error types for vault and ledger operations.

use crate::storage::StorageError;

/// Reason a transaction failed its field-level invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("transaction is not a JSON object")]
    NotAnObject,

    #[error("missing or mistyped field: {0}")]
    InvalidField(&'static str),

    #[error("amount must be a positive whole number of cents")]
    InvalidAmount,

    #[error("invalid calendar date: {0}")]
    InvalidDate(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown transaction type: {0}")]
    InvalidType(String),

    #[error("category must not be empty")]
    EmptyCategory,
}

/// Errors surfaced at the vault boundary.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("invalid passphrase")]
    InvalidPassphrase,

    #[error("decryption failed - wrong key or corrupted data")]
    DecryptionError,

    #[error("vault is enabled but no session key was supplied")]
    MissingKey,

    #[error("invalid vault data format: {0}")]
    InvalidFormat(String),

    #[error("vault is already enabled - disable it before enabling again")]
    AlreadyEnabled,

    #[error("vault is not enabled")]
    NotEnabled,

    #[error("vault is locked - unlock with the passphrase first")]
    VaultLocked,

    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type VaultResult<T> = Result<T, VaultError>;
