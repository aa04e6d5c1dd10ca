//! Collaborator seams for the ledger core.
//!
//! The core consumes three external services: an ordered, live-updating
//! document feed ([`LedgerSource`]), a persistence endpoint that assigns ids
//! and durably stores new entries ([`LedgerWriter`]), and a blob store that
//! turns local file handles into durable URLs ([`BlobStore`]). All three are
//! trait objects passed in explicitly, so tests and the bundled binary can
//! run against the in-process [`memory::MemoryLedger`] while a deployment
//! wires in real backends.

/// In-process implementation of all three collaborator seams
pub mod memory;

use crate::{
    errors::Result,
    models::{EntryKind, LedgerEntry, LocalFile},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// A ledger document as delivered by the remote store.
///
/// Every field beyond `id` is lenient: the store has seen more than one
/// schema revision, so records missing a title, date, or kind must still
/// deserialize. Normalization into a [`LedgerEntry`] happens in
/// [`RemoteEntryRecord::into_entry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntryRecord {
    /// Store-assigned document id
    pub id: String,
    /// Absent in records persisted by the pre-title schema revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Wire field is `type`; kept as a raw string so unknown values can be
    /// tolerated rather than failing deserialization
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, rename = "attachmentURL", skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

impl RemoteEntryRecord {
    /// Normalizes a remote record into a [`LedgerEntry`].
    ///
    /// One malformed record must never blank the whole ledger, so every
    /// defect is repaired locally rather than rejected:
    /// - a missing date becomes `now`
    /// - a missing title becomes the empty string (legacy revision records)
    /// - a missing or non-finite amount becomes `0.0`; a negative amount is
    ///   folded to its absolute value (direction lives in the kind)
    /// - an unrecognized kind becomes [`EntryKind::Expense`]
    ///
    /// This is a recoverable-locally tolerance, not a data-integrity
    /// guarantee; each repair is logged at `warn` level.
    #[must_use]
    pub fn into_entry(self, now: DateTime<Utc>) -> LedgerEntry {
        let kind = match self.kind.as_deref() {
            Some(raw) => EntryKind::parse(raw).unwrap_or_else(|| {
                warn!(id = %self.id, kind = raw, "unrecognized entry kind, treating as expense");
                EntryKind::Expense
            }),
            None => {
                warn!(id = %self.id, "record missing kind, treating as expense");
                EntryKind::Expense
            }
        };

        let amount = match self.amount {
            Some(value) if value.is_finite() => value.abs(),
            Some(value) => {
                warn!(id = %self.id, amount = value, "non-finite amount, treating as zero");
                0.0
            }
            None => {
                warn!(id = %self.id, "record missing amount, treating as zero");
                0.0
            }
        };

        let date = self.date.unwrap_or_else(|| {
            warn!(id = %self.id, "record missing date, defaulting to now");
            now
        });

        LedgerEntry {
            id: self.id,
            title: self.title.unwrap_or_default(),
            amount,
            kind,
            note: self.note.unwrap_or_default(),
            date,
            attachment_url: self.attachment_url,
        }
    }
}

/// One delivery from the remote feed.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The feed's current full document set. Always a whole replacement,
    /// never a patch.
    Snapshot(Vec<RemoteEntryRecord>),
    /// The feed disconnected or denied access. Non-fatal; the store keeps
    /// its last-known snapshot.
    Error {
        /// Human-readable reason, surfaced to observers
        message: String,
    },
}

/// Handle for one live feed subscription.
///
/// Dropping the handle unsubscribes: the source observes the closed channel
/// on its next delivery and releases the listener.
#[derive(Debug)]
pub struct LedgerSubscription {
    events: mpsc::Receiver<FeedEvent>,
}

impl LedgerSubscription {
    /// Wraps a receiving channel as a subscription handle.
    #[must_use]
    pub const fn new(events: mpsc::Receiver<FeedEvent>) -> Self {
        Self { events }
    }

    /// Awaits the next feed delivery. Returns `None` once the source has
    /// closed the feed (e.g. shutdown).
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }
}

/// An ordered, live-updating ledger document feed keyed by user identity.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Opens a push subscription scoped to `user_id`, ordered by date
    /// descending. The current full document set is delivered as the first
    /// event; every subsequent change delivers the full set again.
    async fn subscribe(&self, user_id: &str) -> Result<LedgerSubscription>;
}

/// A fully-specified entry as handed to the persistence collaborator.
///
/// Unlike [`RemoteEntryRecord`] nothing here is optional: validation and
/// date defaulting have already happened in [`crate::core::draft`].
#[derive(Debug, Clone)]
pub struct NewEntryRecord {
    /// Owning user; the write is scoped to this user's ledger
    pub user_id: String,
    pub title: String,
    pub amount: f64,
    pub kind: EntryKind,
    pub note: String,
    pub date: DateTime<Utc>,
    pub attachment_url: Option<String>,
}

/// The persistence endpoint for new ledger entries.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Assigns an id, persists the entry, and triggers a subsequent feed
    /// delivery that includes it. Failure surfaces as a rejected submission;
    /// the ledger snapshot is unaffected since it only changes via the feed.
    async fn submit(&self, entry: NewEntryRecord) -> Result<LedgerEntry>;
}

/// Durable storage for draft attachments.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads a local file and returns its durable URL.
    async fn store(&self, file: LocalFile) -> Result<String>;
}
