//! Aggregation engine - pure derivation from ledger snapshots to summary figures.
//!
//! All functions here are referentially transparent: identical input snapshot
//! means identical output, no hidden state, safe to call on every read. Totals
//! accumulate in integer cents so that summation order can never make
//! `total_income - total_expenses` drift from `profit` at the cent level.

use crate::models::{EntryKind, LedgerEntry};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A time-based filter predicate applied to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// Every entry, unfiltered
    All,
    /// Entries dated in the current calendar year at evaluation time
    Yearly,
    /// Entries dated in the current calendar month and year at evaluation time
    Monthly,
}

impl Window {
    /// Human-readable label for report headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all time",
            Self::Yearly => "this year",
            Self::Monthly => "this month",
        }
    }
}

/// Derived scalar figures for one snapshot or window subset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    /// May be negative (loss) - sign carries meaning here, unlike
    /// `LedgerEntry::amount`
    pub profit: f64,
}

// Cast safety: amounts are business-scale currency values, far below the
// ~9e13 where f64 loses cent precision.
#[allow(clippy::cast_possible_truncation)]
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn sum_cents(entries: &[LedgerEntry], kind: EntryKind) -> i64 {
    entries
        .iter()
        .filter(|entry| entry.kind == kind)
        .map(|entry| to_cents(entry.amount))
        .sum()
}

/// Sum of `amount` over income entries.
#[must_use]
pub fn total_income(entries: &[LedgerEntry]) -> f64 {
    from_cents(sum_cents(entries, EntryKind::Income))
}

/// Sum of `amount` over expense entries.
#[must_use]
pub fn total_expenses(entries: &[LedgerEntry]) -> f64 {
    from_cents(sum_cents(entries, EntryKind::Expense))
}

/// `total_income - total_expenses`; negative means a loss.
#[must_use]
pub fn profit(entries: &[LedgerEntry]) -> f64 {
    from_cents(sum_cents(entries, EntryKind::Income) - sum_cents(entries, EntryKind::Expense))
}

/// Computes all three summary figures in one pass over the snapshot.
#[must_use]
pub fn summarize(entries: &[LedgerEntry]) -> LedgerSummary {
    let income_cents = sum_cents(entries, EntryKind::Income);
    let expense_cents = sum_cents(entries, EntryKind::Expense);

    LedgerSummary {
        total_income: from_cents(income_cents),
        total_expenses: from_cents(expense_cents),
        profit: from_cents(income_cents - expense_cents),
    }
}

/// Retains the entries whose `date` falls inside `window`, evaluated against
/// the caller-supplied instant.
///
/// "Current" year/month is whatever `now` says: a long-lived monthly view
/// does not roll over at midnight unless the caller recomputes with a fresh
/// instant. Entry order is preserved.
#[must_use]
pub fn filter_by_window(
    entries: &[LedgerEntry],
    window: Window,
    now: DateTime<Utc>,
) -> Vec<LedgerEntry> {
    match window {
        Window::All => entries.to_vec(),
        Window::Yearly => entries
            .iter()
            .filter(|entry| entry.date.year() == now.year())
            .cloned()
            .collect(),
        Window::Monthly => entries
            .iter()
            .filter(|entry| entry.date.year() == now.year() && entry.date.month() == now.month())
            .cloned()
            .collect(),
    }
}
