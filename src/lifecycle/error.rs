//! Fatal errors that end a server run.

use thiserror::Error;

use crate::domain::RecordKind;
use crate::storage::StoreError;

/// Errors that terminate the supervised process group.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The serving loop failed after startup.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// A hard purge failed and its policy escalated it.
    #[error("purge of {kind} failed after {attempts} attempt(s): {source}")]
    Purge {
        kind: RecordKind,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// A supervised task panicked.
    #[error("supervised task failed: {0}")]
    Task(String),
}
