//! Draft validation and submission - the acceptance gate in front of the
//! write collaborator.
//!
//! Validation is synchronous and side-effect-free; it never touches the
//! network. Only a draft that passes validation reaches the blob store or the
//! writer, so a rejected draft provably makes no submission call.

use crate::{
    errors::{Error, Result},
    models::{Attachment, EntryDraft, LedgerEntry},
    source::{BlobStore, LedgerWriter, NewEntryRecord},
};
use chrono::Utc;
use tracing::info;

/// Acceptance rules applied to drafts before submission.
///
/// `require_title` exists because records persisted by the pre-title schema
/// revision have no title: deployments that still read such ledgers can relax
/// the rule explicitly instead of inheriting a silent merge of both
/// revisions' validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidationPolicy {
    /// Reject drafts whose title is empty or whitespace-only
    pub require_title: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        // Canonical schema revision: titles are required
        Self {
            require_title: true,
        }
    }
}

/// Checks a draft against the acceptance rules.
///
/// # Errors
/// * [`Error::InvalidAmount`] - amount is not a positive finite number
/// * [`Error::MissingTitle`] - title is empty or whitespace-only while the
///   policy requires one
pub fn validate_draft(draft: &EntryDraft, policy: &ValidationPolicy) -> Result<()> {
    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: draft.amount,
        });
    }

    if policy.require_title && draft.title.trim().is_empty() {
        return Err(Error::MissingTitle);
    }

    Ok(())
}

/// Validates a draft and submits it to the persistence collaborator.
///
/// The date defaults to the submission instant when the draft carries none.
/// A local attachment is uploaded through the blob store first, so the
/// persisted entry only ever references a durable URL. The ledger snapshot is
/// not touched here - the new entry arrives through the read feed once the
/// writer has persisted it.
pub async fn submit_draft(
    writer: &dyn LedgerWriter,
    blobs: &dyn BlobStore,
    policy: &ValidationPolicy,
    user_id: &str,
    draft: EntryDraft,
) -> Result<LedgerEntry> {
    validate_draft(&draft, policy)?;

    let date = draft.date.unwrap_or_else(Utc::now);
    let attachment_url = match draft.attachment {
        Some(Attachment::Local(file)) => Some(blobs.store(file).await?),
        Some(Attachment::Url(url)) => Some(url),
        None => None,
    };

    let entry = writer
        .submit(NewEntryRecord {
            user_id: user_id.to_string(),
            title: draft.title,
            amount: draft.amount,
            kind: draft.kind,
            note: draft.note,
            date,
            attachment_url,
        })
        .await?;

    info!(user_id, id = %entry.id, kind = entry.kind.as_str(), "entry submitted");
    Ok(entry)
}
