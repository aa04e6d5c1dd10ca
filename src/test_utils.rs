//! Shared test utilities for `BillBuddy`.
//!
//! This module provides common helper functions for building test entries,
//! wire records, and drafts with sensible defaults, plus test doubles for the
//! write collaborator.

#![allow(clippy::unwrap_used)]

use crate::{
    errors::{Error, Result},
    models::{EntryDraft, EntryKind, LedgerEntry},
    source::{LedgerWriter, NewEntryRecord, RemoteEntryRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Initializes tracing with the test writer so `--nocapture` shows logs.
/// Safe to call from every test; only the first call takes effect.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// A UTC timestamp at noon on the given day.
pub fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Creates a well-formed ledger entry dated at noon on the given day.
///
/// # Defaults
/// * `title`: the id (keeps assertions readable)
/// * `note`: empty
/// * `attachment_url`: None
pub fn entry_on(
    id: &str,
    kind: EntryKind,
    amount: f64,
    year: i32,
    month: u32,
    day: u32,
) -> LedgerEntry {
    LedgerEntry {
        id: id.to_string(),
        title: id.to_string(),
        amount,
        kind,
        note: String::new(),
        date: utc_date(year, month, day),
        attachment_url: None,
    }
}

/// Creates a well-formed wire record for feed fixtures.
pub fn test_record(id: &str, kind: &str, amount: f64, date: DateTime<Utc>) -> RemoteEntryRecord {
    RemoteEntryRecord {
        id: id.to_string(),
        title: Some(id.to_string()),
        amount: Some(amount),
        kind: Some(kind.to_string()),
        note: None,
        date: Some(date),
        attachment_url: None,
    }
}

/// Creates a draft with sensible defaults.
///
/// # Defaults
/// * `title`: `"Test entry"`
/// * `note`: empty
/// * `date`: None (defaults to the submission instant)
/// * `attachment`: None
pub fn test_draft(amount: f64, kind: EntryKind) -> EntryDraft {
    EntryDraft {
        title: "Test entry".to_string(),
        amount,
        kind,
        note: String::new(),
        date: None,
        attachment: None,
    }
}

/// Write collaborator double that counts submissions, optionally rejecting
/// every one. Lets tests assert that a rejected draft never reaches the
/// writer.
#[derive(Debug, Default)]
pub struct CountingWriter {
    calls: AtomicUsize,
    reject: bool,
}

impl CountingWriter {
    /// A writer that rejects every submission with a write error.
    pub const fn rejecting() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reject: true,
        }
    }

    /// Number of submissions received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerWriter for CountingWriter {
    async fn submit(&self, entry: NewEntryRecord) -> Result<LedgerEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(Error::Write {
                message: "writer configured to reject".to_string(),
            });
        }

        Ok(LedgerEntry {
            id: Uuid::new_v4().to_string(),
            title: entry.title,
            amount: entry.amount,
            kind: entry.kind,
            note: entry.note,
            date: entry.date,
            attachment_url: entry.attachment_url,
        })
    }
}
