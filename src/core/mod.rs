//! Core business logic - framework-agnostic ledger operations.
//!
//! Everything in here is pure or collaborator-driven: no channel handles, no
//! subscription state. The ledger store feeds snapshots in; these modules
//! derive figures, validate drafts, and build export reports.

/// Pure aggregation over ledger snapshots (totals, windows)
pub mod aggregate;
/// Draft validation and the submission path to the write collaborator
pub mod draft;
/// Structured export report building
pub mod export;
