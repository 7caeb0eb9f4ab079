// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ringgit amounts. Everything is stored as integer cents.

const CURRENCY_SYMBOL: &str = "RM";

/// Parse user input such as `"1,234.5"` into cents.
///
/// Accepts digits with at most two decimals; thousands separators are
/// ignored. Empty, negative or otherwise malformed input yields `None`.
pub fn parse_amount_to_cents(input: &str) -> Option<u64> {
    let normalized: String = input.trim().chars().filter(|c| *c != ',').collect();
    if normalized.is_empty() {
        return None;
    }

    let (whole, frac) = match normalized.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (normalized.as_str(), ""),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: u64 = whole.parse().ok()?;
    let frac: u64 = format!("{frac:0<2}").parse().ok()?;
    whole.checked_mul(100)?.checked_add(frac)
}

/// Render cents as `RM1,234.50`; negative amounts as `-RM5.00`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{sign}{CURRENCY_SYMBOL}{}.{:02}",
        group_thousands(abs / 100),
        abs % 100
    )
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
