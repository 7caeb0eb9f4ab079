// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-week aggregates for charting.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{Transaction, TransactionType};
use crate::week::week_days;

/// Income and expense totals for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySeriesPoint {
    pub day: String,
    pub income_cents: u64,
    pub expense_cents: u64,
    pub net_cents: i64,
}

/// Totals over a whole week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekTotals {
    pub income_cents: u64,
    pub expense_cents: u64,
    pub net_cents: i64,
}

fn net(income: u64, expense: u64) -> i64 {
    let income = i64::try_from(income).unwrap_or(i64::MAX);
    let expense = i64::try_from(expense).unwrap_or(i64::MAX);
    income.saturating_sub(expense)
}

/// One point per day of the week starting at `week_start`, in day order.
///
/// Days without transactions are zero; transactions outside the week are
/// ignored.
pub fn build_weekly_daily_series(
    transactions: &[Transaction],
    week_start: &str,
) -> Result<Vec<DailySeriesPoint>, ValidationError> {
    let days = week_days(week_start)?;
    let mut totals: HashMap<&str, (u64, u64)> =
        days.iter().map(|day| (day.as_str(), (0, 0))).collect();

    for t in transactions {
        let Some((income, expense)) = totals.get_mut(t.date.as_str()) else {
            continue;
        };
        match t.kind {
            TransactionType::Income => *income = income.saturating_add(t.amount_cents),
            TransactionType::Expense => *expense = expense.saturating_add(t.amount_cents),
        }
    }

    Ok(days
        .iter()
        .map(|day| {
            let (income, expense) = totals.get(day.as_str()).copied().unwrap_or_default();
            DailySeriesPoint {
                day: day.clone(),
                income_cents: income,
                expense_cents: expense,
                net_cents: net(income, expense),
            }
        })
        .collect())
}

/// Transactions dated inside the week starting at `week_start`, in the
/// order given.
pub fn transactions_in_week<'a>(
    transactions: &'a [Transaction],
    week_start: &str,
) -> Result<Vec<&'a Transaction>, ValidationError> {
    let days = week_days(week_start)?;
    Ok(transactions
        .iter()
        .filter(|t| days.iter().any(|day| *day == t.date))
        .collect())
}

pub fn week_totals(
    transactions: &[Transaction],
    week_start: &str,
) -> Result<WeekTotals, ValidationError> {
    let series = build_weekly_daily_series(transactions, week_start)?;
    let (income, expense) = series.iter().fold((0u64, 0u64), |(i, e), point| {
        (
            i.saturating_add(point.income_cents),
            e.saturating_add(point.expense_cents),
        )
    });
    Ok(WeekTotals {
        income_cents: income,
        expense_cents: expense,
        net_cents: net(income, expense),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, date: &str, kind: TransactionType, amount_cents: u64) -> Transaction {
        Transaction {
            id: id.to_string(),
            amount_cents,
            date: date.to_string(),
            kind,
            category: "General".to_string(),
            note: String::new(),
            created_at: "2026-03-01T00:00:00.000Z".to_string(),
            updated_at: "2026-03-01T00:00:00.000Z".to_string(),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("a", "2026-03-02", TransactionType::Income, 10_000),
            tx("b", "2026-03-02", TransactionType::Expense, 2_500),
            tx("c", "2026-03-05", TransactionType::Expense, 1_200),
            tx("d", "2026-03-09", TransactionType::Income, 99_999),
            tx("e", "2026-03-01", TransactionType::Expense, 7),
        ]
    }

    #[test]
    fn series_covers_seven_days() {
        let series = build_weekly_daily_series(&sample(), "2026-03-02").unwrap();
        let days: Vec<&str> = series.iter().map(|p| p.day.as_str()).collect();
        assert_eq!(
            days,
            vec![
                "2026-03-02",
                "2026-03-03",
                "2026-03-04",
                "2026-03-05",
                "2026-03-06",
                "2026-03-07",
                "2026-03-08"
            ]
        );

        assert_eq!(
            series[0],
            DailySeriesPoint {
                day: "2026-03-02".to_string(),
                income_cents: 10_000,
                expense_cents: 2_500,
                net_cents: 7_500,
            }
        );
        assert_eq!(series[1].income_cents, 0);
        assert_eq!(series[1].net_cents, 0);
        assert_eq!(series[3].net_cents, -1_200);
    }

    #[test]
    fn empty_week_is_all_zero() {
        let series = build_weekly_daily_series(&[], "2026-03-02").unwrap();
        assert_eq!(series.len(), 7);
        assert!(series.iter().all(|p| p.income_cents == 0 && p.expense_cents == 0));
    }

    #[test]
    fn series_serializes_camel_case() {
        let series = build_weekly_daily_series(&sample(), "2026-03-02").unwrap();
        let value = serde_json::to_value(&series[0]).unwrap();
        assert_eq!(value["incomeCents"], 10_000);
        assert_eq!(value["netCents"], 7_500);
    }

    #[test]
    fn filters_and_totals_by_week() {
        let all = sample();
        let ids: Vec<&str> = transactions_in_week(&all, "2026-03-02")
            .unwrap()
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert_eq!(
            week_totals(&all, "2026-03-02").unwrap(),
            WeekTotals {
                income_cents: 10_000,
                expense_cents: 3_700,
                net_cents: 6_300,
            }
        );
    }

    #[test]
    fn invalid_week_start_is_rejected() {
        assert!(build_weekly_daily_series(&sample(), "March").is_err());
    }
}
