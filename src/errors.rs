use thiserror::Error;

/// Unified error type for all ledger operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid amount: {amount} (must be a positive finite number)")]
    InvalidAmount { amount: f64 },

    #[error("Title must not be empty")]
    MissingTitle,

    #[error("Unrecognized entry kind: {kind}")]
    InvalidKind { kind: String },

    #[error("Subscription error: {message}")]
    Subscription { message: String },

    #[error("Write rejected: {message}")]
    Write { message: String },

    #[error("Attachment upload failed: {message}")]
    Blob { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
