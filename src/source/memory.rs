//! In-process ledger backend.
//!
//! `MemoryLedger` implements all three collaborator seams against process
//! memory: documents live in a per-user map, subscribers receive the full
//! document set through bounded channels, and blobs are held as byte buffers
//! behind `memory://` URLs. It mirrors the remote store's contract closely
//! enough to back the bundled binary and the integration tests: a write
//! triggers a full-set feed delivery to every subscriber of the owning user.

use crate::{
    errors::Result,
    models::{LedgerEntry, LocalFile},
    source::{
        BlobStore, FeedEvent, LedgerSource, LedgerSubscription, LedgerWriter, NewEntryRecord,
        RemoteEntryRecord,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

// Bursts beyond this many undelivered events indicate a stalled consumer;
// the subscriber is dropped rather than buffered without bound.
const FEED_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct Inner {
    /// Documents per user, in arrival order
    records: HashMap<String, Vec<RemoteEntryRecord>>,
    /// Live subscribers per user
    subscribers: HashMap<String, Vec<mpsc::Sender<FeedEvent>>>,
    /// Uploaded blobs keyed by their `memory://` URL
    blobs: HashMap<String, LocalFile>,
}

/// In-process implementation of [`LedgerSource`], [`LedgerWriter`], and
/// [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryLedger {
    /// Creates an empty in-process ledger backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a user's document set wholesale and notifies subscribers.
    /// Used to seed the ledger from a snapshot file or a test fixture.
    pub async fn seed(&self, user_id: &str, records: Vec<RemoteEntryRecord>) {
        let mut inner = self.inner.write().await;
        info!(user_id, count = records.len(), "seeding ledger");
        inner.records.insert(user_id.to_string(), records);
        Self::notify(&mut inner, user_id);
    }

    /// Appends a single raw document and notifies subscribers. Lets tests
    /// inject records the canonical write path would never produce
    /// (missing dates, unknown kinds).
    pub async fn push_record(&self, user_id: &str, record: RemoteEntryRecord) {
        let mut inner = self.inner.write().await;
        inner
            .records
            .entry(user_id.to_string())
            .or_default()
            .push(record);
        Self::notify(&mut inner, user_id);
    }

    /// Delivers a feed error to a user's subscribers, simulating a
    /// disconnect or permission denial. The document set is untouched.
    pub async fn emit_error(&self, user_id: &str, message: &str) {
        let mut inner = self.inner.write().await;
        let event = FeedEvent::Error {
            message: message.to_string(),
        };
        let senders = inner.subscribers.entry(user_id.to_string()).or_default();
        senders.retain(|tx| tx.try_send(event.clone()).is_ok());
    }

    /// Number of live subscriptions for a user. Test observability hook.
    pub async fn subscriber_count(&self, user_id: &str) -> usize {
        let mut inner = self.inner.write().await;
        // Closed channels are only observed on delivery, so sweep them here
        let senders = inner.subscribers.entry(user_id.to_string()).or_default();
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }

    /// Delivers the user's current full document set, date-descending, to
    /// every live subscriber. Closed subscribers are swept on the way.
    fn notify(inner: &mut Inner, user_id: &str) {
        let snapshot = Self::ordered_snapshot(inner, user_id);
        let senders = inner.subscribers.entry(user_id.to_string()).or_default();
        senders.retain(|tx| {
            tx.try_send(FeedEvent::Snapshot(snapshot.clone())).is_ok()
        });
        debug!(
            user_id,
            subscribers = senders.len(),
            documents = snapshot.len(),
            "delivered feed snapshot"
        );
    }

    fn ordered_snapshot(inner: &Inner, user_id: &str) -> Vec<RemoteEntryRecord> {
        let mut snapshot = inner
            .records
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        // The feed contract is date-descending; undated legacy records sort last
        snapshot.sort_by(|a, b| b.date.cmp(&a.date));
        snapshot
    }
}

#[async_trait]
impl LedgerSource for MemoryLedger {
    async fn subscribe(&self, user_id: &str) -> Result<LedgerSubscription> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);

        let mut inner = self.inner.write().await;
        // Initial delivery: the current full set, before any future change
        let snapshot = Self::ordered_snapshot(&inner, user_id);
        let _ = tx.try_send(FeedEvent::Snapshot(snapshot));
        inner
            .subscribers
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        info!(user_id, "feed subscription opened");

        Ok(LedgerSubscription::new(rx))
    }
}

#[async_trait]
impl LedgerWriter for MemoryLedger {
    async fn submit(&self, entry: NewEntryRecord) -> Result<LedgerEntry> {
        let record = RemoteEntryRecord {
            id: Uuid::new_v4().to_string(),
            title: Some(entry.title),
            amount: Some(entry.amount),
            kind: Some(entry.kind.as_str().to_string()),
            note: Some(entry.note),
            date: Some(entry.date),
            attachment_url: entry.attachment_url,
        };

        let mut inner = self.inner.write().await;
        inner
            .records
            .entry(entry.user_id.clone())
            .or_default()
            .push(record.clone());
        info!(user_id = %entry.user_id, id = %record.id, "entry persisted");
        Self::notify(&mut inner, &entry.user_id);

        Ok(record.into_entry(Utc::now()))
    }
}

#[async_trait]
impl BlobStore for MemoryLedger {
    async fn store(&self, file: LocalFile) -> Result<String> {
        let url = format!("memory://blobs/{}/{}", Uuid::new_v4(), file.filename);
        let mut inner = self.inner.write().await;
        inner.blobs.insert(url.clone(), file);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::EntryKind;
    use crate::source::FeedEvent;
    use crate::test_utils::{test_record, utc_date};

    fn new_entry(user_id: &str, amount: f64) -> NewEntryRecord {
        NewEntryRecord {
            user_id: user_id.to_string(),
            title: "Invoice".to_string(),
            amount,
            kind: EntryKind::Income,
            note: String::new(),
            date: utc_date(2024, 2, 10),
            attachment_url: None,
        }
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_snapshot() {
        let ledger = MemoryLedger::new();
        ledger
            .seed("alice", vec![test_record("r1", "income", 100.0, utc_date(2024, 1, 5))])
            .await;

        let mut sub = ledger.subscribe("alice").await.unwrap();
        match sub.next_event().await.unwrap() {
            FeedEvent::Snapshot(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].id, "r1");
            }
            FeedEvent::Error { message } => panic!("unexpected feed error: {message}"),
        }
    }

    #[tokio::test]
    async fn test_submit_triggers_feed_delivery_with_new_entry() {
        let ledger = MemoryLedger::new();
        let mut sub = ledger.subscribe("alice").await.unwrap();
        // Drain the (empty) initial snapshot
        assert!(matches!(
            sub.next_event().await.unwrap(),
            FeedEvent::Snapshot(records) if records.is_empty()
        ));

        let persisted = ledger.submit(new_entry("alice", 250.0)).await.unwrap();
        assert!(!persisted.id.is_empty());

        match sub.next_event().await.unwrap() {
            FeedEvent::Snapshot(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].id, persisted.id);
            }
            FeedEvent::Error { message } => panic!("unexpected feed error: {message}"),
        }
    }

    #[tokio::test]
    async fn test_feed_is_scoped_by_user() {
        let ledger = MemoryLedger::new();
        let mut alice_sub = ledger.subscribe("alice").await.unwrap();
        let mut bob_sub = ledger.subscribe("bob").await.unwrap();
        let _ = alice_sub.next_event().await;
        let _ = bob_sub.next_event().await;

        ledger.submit(new_entry("alice", 40.0)).await.unwrap();

        // Alice sees her write...
        match alice_sub.next_event().await.unwrap() {
            FeedEvent::Snapshot(records) => assert_eq!(records.len(), 1),
            FeedEvent::Error { message } => panic!("unexpected feed error: {message}"),
        }
        // ...while Bob's feed stays quiet
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), bob_sub.next_event())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_snapshot_ordered_date_descending() {
        let ledger = MemoryLedger::new();
        ledger
            .seed(
                "alice",
                vec![
                    test_record("old", "income", 10.0, utc_date(2023, 5, 1)),
                    test_record("new", "income", 20.0, utc_date(2024, 5, 1)),
                    test_record("mid", "income", 30.0, utc_date(2023, 11, 1)),
                ],
            )
            .await;

        let mut sub = ledger.subscribe("alice").await.unwrap();
        match sub.next_event().await.unwrap() {
            FeedEvent::Snapshot(records) => {
                let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
                assert_eq!(ids, ["new", "mid", "old"]);
            }
            FeedEvent::Error { message } => panic!("unexpected feed error: {message}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_released() {
        let ledger = MemoryLedger::new();
        let sub = ledger.subscribe("alice").await.unwrap();
        assert_eq!(ledger.subscriber_count("alice").await, 1);

        drop(sub);
        assert_eq!(ledger.subscriber_count("alice").await, 0);
    }

    #[tokio::test]
    async fn test_emit_error_keeps_documents() {
        let ledger = MemoryLedger::new();
        ledger
            .seed("alice", vec![test_record("r1", "income", 100.0, utc_date(2024, 1, 5))])
            .await;
        let mut sub = ledger.subscribe("alice").await.unwrap();
        let _ = sub.next_event().await;

        ledger.emit_error("alice", "permission denied").await;
        match sub.next_event().await.unwrap() {
            FeedEvent::Error { message } => assert_eq!(message, "permission denied"),
            FeedEvent::Snapshot(_) => panic!("expected feed error"),
        }

        // A fresh subscription still sees the full document set
        let mut fresh = ledger.subscribe("alice").await.unwrap();
        match fresh.next_event().await.unwrap() {
            FeedEvent::Snapshot(records) => assert_eq!(records.len(), 1),
            FeedEvent::Error { message } => panic!("unexpected feed error: {message}"),
        }
    }

    #[tokio::test]
    async fn test_blob_store_returns_distinct_urls() {
        let ledger = MemoryLedger::new();
        let file = LocalFile {
            filename: "receipt.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };

        let first = ledger.store(file.clone()).await.unwrap();
        let second = ledger.store(file).await.unwrap();
        assert!(first.starts_with("memory://blobs/"));
        assert!(first.ends_with("/receipt.png"));
        assert_ne!(first, second);
    }
}
