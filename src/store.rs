//! Ledger store - owns the live feed subscription and publishes a consistent
//! (snapshot, aggregates) view.
//!
//! The store holds at most one subscription at a time, scoped to the active
//! user. Each feed delivery replaces the whole snapshot, re-sorts it by date
//! descending, recomputes the summary, and publishes both as one value: there
//! is no intermediate state where the totals reflect entries observers cannot
//! see yet. Observers register through a `tokio::sync::watch` channel and
//! always read the latest fully-applied view, never a partial one.

use crate::{
    core::aggregate::{self, LedgerSummary},
    errors::Result,
    models::LedgerEntry,
    source::{FeedEvent, LedgerSource, LedgerSubscription, RemoteEntryRecord},
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection state of the feed behind the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedHealth {
    /// No active subscription
    Idle,
    /// Subscription active, view reflects the latest delivery
    Live,
    /// Feed disconnected or denied access; the view keeps the last-known
    /// snapshot rather than blanking the ledger
    Disconnected {
        /// Human-readable reason for display
        message: String,
    },
}

/// One published (snapshot, aggregates) pair.
///
/// Observers receive owned copies; nothing here aliases the store's internal
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerView {
    /// Ledger snapshot, sorted by date descending (stable on ties)
    pub entries: Vec<LedgerEntry>,
    /// Aggregates derived from exactly these entries
    pub summary: LedgerSummary,
    /// Feed connection state
    pub health: FeedHealth,
}

impl LedgerView {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            summary: LedgerSummary::default(),
            health: FeedHealth::Idle,
        }
    }
}

struct ActiveSubscription {
    user_id: String,
    pump: JoinHandle<()>,
}

/// Owns exactly one live ledger subscription per active user session and
/// exposes a read-only, always-consistent view plus derived totals.
pub struct LedgerStore {
    source: Arc<dyn LedgerSource>,
    view_tx: watch::Sender<LedgerView>,
    active: Mutex<Option<ActiveSubscription>>,
    // Bumped on every subscription change; a pump holding a stale value
    // discards its delivery instead of publishing for the wrong user
    epoch: Arc<AtomicU64>,
}

impl LedgerStore {
    /// Creates a store against the given feed source. The collaborator is
    /// passed in explicitly so tests can wire an in-process double.
    #[must_use]
    pub fn new(source: Arc<dyn LedgerSource>) -> Self {
        let (view_tx, _) = watch::channel(LedgerView::empty());
        Self {
            source,
            view_tx,
            active: Mutex::new(None),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The current view. Always a fully-applied (snapshot, aggregates) pair.
    #[must_use]
    pub fn view(&self) -> LedgerView {
        self.view_tx.borrow().clone()
    }

    /// Registers an observer. The receiver yields every published view,
    /// monotonically replacing - never one older than already seen.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<LedgerView> {
        self.view_tx.subscribe()
    }

    /// Begins a subscription scoped to `user_id`, stopping any previous one
    /// first so at most one is ever live.
    ///
    /// With no user (`None`) the store publishes an empty ledger and reports
    /// success - gating on authentication state is the caller's concern.
    ///
    /// # Errors
    /// [`crate::errors::Error::Subscription`] if the source refuses the
    /// subscription; the error is non-fatal and the store stays usable.
    pub async fn start(&self, user_id: Option<&str>) -> Result<()> {
        let mut active = self.active.lock().await;
        self.release(&mut active).await;
        // A user switch must never expose the previous user's entries, even
        // for the moment before the new feed's first delivery
        self.view_tx.send_replace(LedgerView::empty());

        let Some(user_id) = user_id else {
            return Ok(());
        };

        let subscription = match self.source.subscribe(user_id).await {
            Ok(subscription) => subscription,
            Err(error) => {
                let message = error.to_string();
                warn!(user_id, message, "feed subscription refused");
                self.view_tx
                    .send_modify(|view| view.health = FeedHealth::Disconnected { message });
                return Err(error);
            }
        };

        let pump = tokio::spawn(run_pump(
            subscription,
            self.view_tx.clone(),
            Arc::clone(&self.epoch),
            self.epoch.load(Ordering::SeqCst),
        ));
        *active = Some(ActiveSubscription {
            user_id: user_id.to_string(),
            pump,
        });
        info!(user_id, "ledger subscription started");
        Ok(())
    }

    /// Releases the active subscription and clears the view. Idempotent:
    /// with no active subscription this is a no-op.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        if active.is_none() {
            return;
        }
        self.release(&mut active).await;
        self.view_tx.send_replace(LedgerView::empty());
        info!("ledger subscription stopped");
    }

    /// Tears down the active subscription, if any. Callers hold the `active`
    /// lock, so no new subscription can race the teardown.
    async fn release(&self, active: &mut Option<ActiveSubscription>) {
        if let Some(previous) = active.take() {
            // Invalidate first: a pump already past its receive discards
            // the delivery instead of publishing for a stale user
            self.epoch.fetch_add(1, Ordering::SeqCst);
            previous.pump.abort();
            let _ = previous.pump.await;
            debug!(user_id = %previous.user_id, "ledger subscription released");
        }
    }
}

/// Drives one subscription: each delivery is handled to completion before
/// the next is received, so recomputations never overlap.
async fn run_pump(
    mut subscription: LedgerSubscription,
    view_tx: watch::Sender<LedgerView>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
) {
    while let Some(event) = subscription.next_event().await {
        if epoch.load(Ordering::SeqCst) != my_epoch {
            break;
        }
        match event {
            FeedEvent::Snapshot(records) => {
                let entries = normalize_snapshot(records);
                let summary = aggregate::summarize(&entries);
                debug!(count = entries.len(), "ledger snapshot refreshed");
                view_tx.send_replace(LedgerView {
                    entries,
                    summary,
                    health: FeedHealth::Live,
                });
            }
            FeedEvent::Error { message } => {
                warn!(message, "ledger feed error, keeping last snapshot");
                view_tx
                    .send_modify(|view| view.health = FeedHealth::Disconnected { message });
            }
        }
    }
}

/// Turns a feed delivery into the snapshot the store publishes: normalize
/// each record, drop duplicate ids (first occurrence wins), sort by date
/// descending. The sort is stable, so same-date entries keep arrival order.
fn normalize_snapshot(records: Vec<RemoteEntryRecord>) -> Vec<LedgerEntry> {
    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut entries: Vec<LedgerEntry> = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.clone()) {
            warn!(id = %record.id, "duplicate id in feed delivery, keeping first occurrence");
            continue;
        }
        entries.push(record.into_entry(now));
    }
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}
