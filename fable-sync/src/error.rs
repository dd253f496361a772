//! Error types for the synchronization core.
//!
//! Persistence failures are the one error class surfaced to a writer
//! (as a retryable save failure); everything else in the system is
//! absorbed by fallbacks or conservative defaults.

/// Error from the backing record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Read or write failed
    #[error("Store I/O failed: {0}")]
    Io(String),

    /// Store is unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Error from the synchronization layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted record did not decode
    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl SyncError {
    pub(crate) fn corrupt(key: &str, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
