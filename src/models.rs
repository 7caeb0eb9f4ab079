// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Data Models
//!
//! The domain payload that is either stored as plaintext or sealed inside the
//! vault. Field names serialize in camelCase so persisted records stay
//! compatible with the existing slot layout:
//!
//! ```text
//! {"transactions":[{"id":"..","amountCents":1000,"date":"2023-01-01",
//!   "type":"expense","category":"Food","note":"",
//!   "createdAt":"2023-01-01T09:00:00.000Z","updatedAt":"..."}]}
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Transaction
// =============================================================================

/// Direction of money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(other.to_string()),
        }
    }
}

/// One ledger entry.
///
/// `date` is a calendar day (`YYYY-MM-DD`, no timezone). `created_at` and
/// `updated_at` are ISO-8601 UTC strings; they are compared lexicographically
/// for ordering, which is chronological for that format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque unique identifier (UUID v4 when created locally).
    pub id: String,
    /// Positive amount in minor currency units.
    pub amount_cents: u64,
    /// Calendar day of the transaction.
    pub date: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Non-empty, trimmed.
    pub category: String,
    #[serde(default)]
    pub note: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a transaction. Id and timestamps are assigned on add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount_cents: u64,
    pub date: String,
    pub kind: TransactionType,
    pub category: String,
    pub note: Option<String>,
}

/// Partial edit of a transaction. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub amount_cents: Option<u64>,
    pub date: Option<String>,
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self == &TransactionPatch::default()
    }
}

// =============================================================================
// AppState
// =============================================================================

/// The entire user-visible domain: the transaction list in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub transactions: Vec<Transaction>,
}

impl AppState {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
