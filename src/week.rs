// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ISO week arithmetic over `YYYY-MM-DD` strings.
//!
//! Weeks start on Monday. All helpers take and return the same date format
//! transactions are stored with.

use chrono::{Datelike, Days, Local, NaiveDate};

use crate::error::ValidationError;
use crate::transactions::validate_date;

pub const DAYS_PER_WEEK: usize = 7;

pub fn parse_ymd(ymd: &str) -> Result<NaiveDate, ValidationError> {
    validate_date(ymd)
}

pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Monday of the ISO week containing `date`.
pub fn iso_week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    // Only fails at the lower bound of the calendar range.
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Monday of the current local week.
pub fn current_week_start() -> String {
    format_ymd(iso_week_start(Local::now().date_naive()))
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}

pub fn add_days(ymd: &str, days: i64) -> Result<String, ValidationError> {
    let date = parse_ymd(ymd)?;
    shift(date, days)
        .map(format_ymd)
        .ok_or_else(|| ValidationError::InvalidDate(ymd.to_string()))
}

pub fn add_weeks(ymd: &str, weeks: i64) -> Result<String, ValidationError> {
    let days = weeks
        .checked_mul(DAYS_PER_WEEK as i64)
        .ok_or_else(|| ValidationError::InvalidDate(ymd.to_string()))?;
    add_days(ymd, days)
}

/// The seven consecutive days starting at `week_start`.
pub fn week_days(week_start: &str) -> Result<Vec<String>, ValidationError> {
    (0..DAYS_PER_WEEK as i64)
        .map(|offset| add_days(week_start, offset))
        .collect()
}
