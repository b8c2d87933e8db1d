//! Error types for the tally-store crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused to record a message.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The loop owning the store is gone; queries cannot be answered.
    #[error("Store unavailable: the owning loop has stopped")]
    Unavailable,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
