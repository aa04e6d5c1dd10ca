//! Export report building.
//!
//! A report is the content contract with export consumers: a summary block
//! first (window label plus the three totals), then one row per entry in the
//! subset's current sort order. Turning rows into CSV or any other text is
//! the consumer's concern.

use crate::core::aggregate::{self, Window};
use crate::models::{EntryKind, LedgerEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One exported entry row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub title: String,
    pub date: DateTime<Utc>,
    pub kind: EntryKind,
    pub amount: f64,
    pub note: String,
}

/// A windowed ledger report: summary figures first, then rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerReport {
    /// Which window the report covers
    pub window: Window,
    pub total_income: f64,
    pub total_expenses: f64,
    pub profit: f64,
    /// One row per entry, in the subset's sort order
    pub rows: Vec<ReportRow>,
}

/// Builds a report for the given window, evaluated at `now`.
///
/// The summary is derived from exactly the rows below it: both come from the
/// same filtered subset, so the figures always match what the rows show.
#[must_use]
pub fn build_report(entries: &[LedgerEntry], window: Window, now: DateTime<Utc>) -> LedgerReport {
    let subset = aggregate::filter_by_window(entries, window, now);
    let summary = aggregate::summarize(&subset);

    let rows = subset
        .into_iter()
        .map(|entry| ReportRow {
            title: entry.title,
            date: entry.date,
            kind: entry.kind,
            amount: entry.amount,
            note: entry.note,
        })
        .collect();

    LedgerReport {
        window,
        total_income: summary.total_income,
        total_expenses: summary.total_expenses,
        profit: summary.profit,
        rows,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{entry_on, utc_date};

    fn snapshot() -> Vec<LedgerEntry> {
        // Already date-descending, as the ledger store publishes it
        vec![
            entry_on("e2", EntryKind::Expense, 30.0, 2024, 1, 10),
            entry_on("e1", EntryKind::Income, 100.0, 2024, 1, 5),
            entry_on("e3", EntryKind::Income, 50.0, 2023, 12, 1),
        ]
    }

    #[test]
    fn test_report_rows_preserve_snapshot_order() {
        let report = build_report(&snapshot(), Window::All, utc_date(2024, 1, 15));

        let titles: Vec<_> = report.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["e2", "e1", "e3"]);
    }

    #[test]
    fn test_report_summary_matches_rows() {
        let report = build_report(&snapshot(), Window::Yearly, utc_date(2024, 1, 15));

        assert_eq!(report.window, Window::Yearly);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.total_income, 100.0);
        assert_eq!(report.total_expenses, 30.0);
        assert_eq!(report.profit, 70.0);
    }

    #[test]
    fn test_report_empty_window() {
        let report = build_report(&snapshot(), Window::Monthly, utc_date(2025, 6, 1));

        assert!(report.rows.is_empty());
        assert_eq!(report.total_income, 0.0);
        assert_eq!(report.total_expenses, 0.0);
        assert_eq!(report.profit, 0.0);
    }

    #[test]
    fn test_report_row_carries_entry_fields() {
        let mut entry = entry_on("e1", EntryKind::Expense, 12.5, 2024, 3, 3);
        entry.note = "stationery".to_string();

        let report = build_report(&[entry], Window::All, utc_date(2024, 3, 4));
        let row = &report.rows[0];
        assert_eq!(row.title, "e1");
        assert_eq!(row.kind, EntryKind::Expense);
        assert_eq!(row.amount, 12.5);
        assert_eq!(row.note, "stationery");
        assert_eq!(row.date, utc_date(2024, 3, 3));
    }
}
