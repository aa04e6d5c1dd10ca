//! Ledger entry models - the canonical transaction record and its draft shape.
//!
//! A `LedgerEntry` is one income or expense transaction as observed from the
//! remote feed. Entries are immutable once observed; an edit, if ever added,
//! would be modeled as a replacement. Direction is carried by `kind`, never by
//! the sign of `amount`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
}

impl EntryKind {
    /// Parses the wire representation (`"income"` / `"expense"`).
    /// Returns `None` for anything else so the feed boundary can apply its
    /// tolerance policy instead of failing the whole snapshot.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    /// The wire representation of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = crate::errors::Error;

    /// Strict parsing for draft input: unlike [`EntryKind::parse`] at the
    /// feed boundary, user-supplied kinds are rejected, not repaired.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| crate::errors::Error::InvalidKind {
            kind: value.to_string(),
        })
    }
}

/// An in-memory file handle attached to a draft that has not been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Original filename as picked by the user
    pub filename: String,
    /// MIME type, e.g. `image/png` or `application/pdf`
    pub content_type: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

/// Attachment reference carried by a draft.
///
/// A persisted entry has a durable URL or nothing; only unsaved drafts may
/// hold a local file handle. The enum makes the "never both" rule
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Not yet uploaded - the blob store turns this into a URL on submission
    Local(LocalFile),
    /// Already durable
    Url(String),
}

/// One income or expense transaction, as held in the ledger snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Opaque unique identifier, assigned by the persistence collaborator
    /// (or a UUID for transient drafts promoted locally)
    pub id: String,
    /// Display label; non-empty in the canonical schema revision
    pub title: String,
    /// Always positive; direction lives in `kind`
    pub amount: f64,
    /// Income or expense
    pub kind: EntryKind,
    /// Free text, may be empty
    pub note: String,
    /// Sole ordering key; day precision for window filtering
    pub date: DateTime<Utc>,
    /// Durable attachment URL once persisted
    pub attachment_url: Option<String>,
}

/// A transaction as entered by the user, before validation and submission.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    /// Display label
    pub title: String,
    /// Must be a positive finite number to pass validation
    pub amount: f64,
    /// Income or expense
    pub kind: EntryKind,
    /// Free text, may be empty
    pub note: String,
    /// Defaults to the submission instant when absent
    pub date: Option<DateTime<Utc>>,
    /// Optional attachment; a local handle is uploaded on submission
    pub attachment: Option<Attachment>,
}
