// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction list operations.
//!
//! Pure functions over a slice of transactions: nothing here knows about
//! storage or encryption. Every mutation returns the next list already in
//! canonical order (newest `date` first, then newest `createdAt` first).
//!
//! [`coerce`] is the permissive parser used on untrusted input: entries that
//! fail the field invariants are dropped so that one corrupt record cannot
//! block loading the rest.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{NewTransaction, Transaction, TransactionPatch, TransactionType};

// =============================================================================
// Ordering
// =============================================================================

/// Canonical comparison: descending by date, ties by descending createdAt.
pub fn canonical_order(a: &Transaction, b: &Transaction) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sort in place into canonical order. Stable, so equal keys keep their
/// relative position.
pub fn sort_canonical(list: &mut [Transaction]) {
    list.sort_by(canonical_order);
}

/// Whether `list` is already in canonical order.
pub fn is_canonical(list: &[Transaction]) -> bool {
    list.windows(2)
        .all(|pair| canonical_order(&pair[0], &pair[1]) != Ordering::Greater)
}

// =============================================================================
// CRUD
// =============================================================================

/// Current time in the stored timestamp format (`2026-02-05T10:00:00.000Z`).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Look up a transaction by id.
pub fn find<'a>(list: &'a [Transaction], id: &str) -> Option<&'a Transaction> {
    list.iter().find(|t| t.id == id)
}

/// Create a transaction from `input` and return it with the next list.
pub fn add(
    list: &[Transaction],
    input: NewTransaction,
) -> Result<(Transaction, Vec<Transaction>), ValidationError> {
    let now = now_timestamp();
    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        amount_cents: input.amount_cents,
        date: input.date,
        kind: input.kind,
        category: input.category.trim().to_string(),
        note: input.note.unwrap_or_default().trim().to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    validate(&transaction)?;

    let mut next = Vec::with_capacity(list.len() + 1);
    next.push(transaction.clone());
    next.extend_from_slice(list);
    sort_canonical(&mut next);

    Ok((transaction, next))
}

/// Apply `patch` to the transaction with `id`.
///
/// Returns `None` and an unchanged list when the id is unknown. `id` and
/// `createdAt` are preserved, `updatedAt` is refreshed.
pub fn update(
    list: &[Transaction],
    id: &str,
    patch: TransactionPatch,
) -> Result<(Option<Transaction>, Vec<Transaction>), ValidationError> {
    let Some(idx) = list.iter().position(|t| t.id == id) else {
        return Ok((None, list.to_vec()));
    };

    let existing = &list[idx];
    let updated = Transaction {
        id: existing.id.clone(),
        amount_cents: patch.amount_cents.unwrap_or(existing.amount_cents),
        date: patch.date.unwrap_or_else(|| existing.date.clone()),
        kind: patch.kind.unwrap_or(existing.kind),
        category: patch
            .category
            .as_deref()
            .unwrap_or(&existing.category)
            .trim()
            .to_string(),
        note: patch
            .note
            .as_deref()
            .unwrap_or(&existing.note)
            .trim()
            .to_string(),
        created_at: existing.created_at.clone(),
        updated_at: now_timestamp(),
    };
    validate(&updated)?;

    let mut next = list.to_vec();
    next[idx] = updated.clone();
    sort_canonical(&mut next);

    Ok((Some(updated), next))
}

/// Remove the transaction with `id`. Returns `false` and an unchanged list
/// when it does not exist.
pub fn remove(list: &[Transaction], id: &str) -> (bool, Vec<Transaction>) {
    let next: Vec<Transaction> = list.iter().filter(|t| t.id != id).cloned().collect();
    let removed = next.len() != list.len();
    (removed, next)
}

// =============================================================================
// Validation & Coercion
// =============================================================================

/// Check the field invariants of an already-typed transaction.
pub fn validate(t: &Transaction) -> Result<(), ValidationError> {
    if t.amount_cents == 0 {
        return Err(ValidationError::InvalidAmount);
    }
    validate_date(&t.date)?;
    if t.category.trim().is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    Ok(())
}

/// `YYYY-MM-DD` with a real calendar day.
pub fn validate_date(date: &str) -> Result<NaiveDate, ValidationError> {
    // chrono tolerates padding before numeric fields, so check the shape first.
    let well_formed = date.len() == 10
        && date.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(ValidationError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))
}

/// Structural validation of an untrusted value, dropping it on any failure.
pub fn coerce(value: &Value) -> Option<Transaction> {
    match try_coerce(value) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::debug!(reason = %e, "Dropping invalid transaction record");
            None
        }
    }
}

/// Coerce every element of a JSON array, skipping the invalid ones, and sort.
pub fn coerce_list(values: &[Value]) -> Vec<Transaction> {
    let mut list: Vec<Transaction> = values.iter().filter_map(coerce).collect();
    sort_canonical(&mut list);
    list
}

/// Structural validation reporting why a value was rejected.
pub fn try_coerce(value: &Value) -> Result<Transaction, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let id = string_field(obj, "id")?;
    let amount_cents = amount_field(obj)?;

    let date = string_field(obj, "date")?;
    validate_date(&date)?;

    let kind = match obj.get("type").and_then(Value::as_str) {
        Some(raw) => raw
            .parse::<TransactionType>()
            .map_err(ValidationError::InvalidType)?,
        None => return Err(ValidationError::InvalidField("type")),
    };

    let category = string_field(obj, "category")?;
    if category.trim().is_empty() {
        return Err(ValidationError::EmptyCategory);
    }

    let note = obj
        .get("note")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let created_at = timestamp_field(obj, "createdAt")?;
    let updated_at = timestamp_field(obj, "updatedAt")?;

    Ok(Transaction {
        id,
        amount_cents,
        date,
        kind,
        category,
        note,
        created_at,
        updated_at,
    })
}

fn string_field(obj: &Map<String, Value>, name: &'static str) -> Result<String, ValidationError> {
    obj.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ValidationError::InvalidField(name))
}

fn timestamp_field(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<String, ValidationError> {
    let raw = string_field(obj, name)?;
    DateTime::parse_from_rfc3339(&raw).map_err(|_| ValidationError::InvalidTimestamp(raw.clone()))?;
    Ok(raw)
}

/// Largest integer a JSON number can carry exactly as an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn amount_field(obj: &Map<String, Value>) -> Result<u64, ValidationError> {
    let Some(Value::Number(number)) = obj.get("amountCents") else {
        return Err(ValidationError::InvalidField("amountCents"));
    };

    // Integral floats such as `1000.0` count as integers.
    let amount = if let Some(n) = number.as_u64() {
        n
    } else {
        match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f > 0.0 && f <= MAX_SAFE_INTEGER => f as u64,
            _ => return Err(ValidationError::InvalidAmount),
        }
    };

    if amount == 0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount)
}
