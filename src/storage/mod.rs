//! Record storage subsystem.
//!
//! # Data Flow
//! ```text
//! Request handlers:
//!     → Storage (CRUD reads/writes)
//!     → SoftDeleteStore::mark_deleted (flag one row)
//!
//! Batch purger:
//!     → SoftDeleteStore::purge_deleted (physically remove flagged rows)
//! ```
//!
//! # Design Decisions
//! - The purger only sees `SoftDeleteStore`; handlers see the wider `Storage`
//! - Soft-deleted rows are filtered out of every read
//! - The store owns whatever locking keeps a purge consistent with
//!   concurrent soft deletes
//! - `memory` is the default and test backend; `sqlite` persists across
//!   restarts, so soft-deleted rows can outlive the run that flagged them

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::domain::{Book, NewBook, NewUser, RecordKind, User, UserUpdate};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors returned by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record absent, already soft-deleted, or purged.
    #[error("{kind} record {id} not found")]
    NotFound { kind: RecordKind, id: String },

    /// A listing found no visible records.
    #[error("no {0} stored")]
    Empty(RecordKind),

    /// A user with this email is already registered.
    #[error("user with email {0} already exists")]
    AlreadyExists(String),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The backend itself failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The soft-delete contract consumed by the purge core.
#[async_trait]
pub trait SoftDeleteStore: Send + Sync {
    /// Flag one record as deleted.
    async fn mark_deleted(&self, kind: RecordKind, id: &str) -> StoreResult<()>;

    /// Physically remove every flagged record of `kind`, returning how many
    /// were removed. Zero flagged records is a no-op returning 0.
    async fn purge_deleted(&self, kind: RecordKind) -> StoreResult<u64>;
}

/// Full storage contract used by the HTTP handlers.
#[async_trait]
pub trait Storage: SoftDeleteStore {
    async fn save_user(&self, user: NewUser) -> StoreResult<String>;
    async fn user_by_email(&self, email: &str) -> StoreResult<User>;
    async fn users(&self) -> StoreResult<Vec<User>>;
    async fn update_user(&self, uid: &str, update: UserUpdate) -> StoreResult<()>;

    async fn save_book(&self, book: NewBook) -> StoreResult<String>;
    async fn book(&self, bid: &str) -> StoreResult<Book>;
    async fn books(&self) -> StoreResult<Vec<Book>>;
    async fn books_by_user(&self, uid: &str) -> StoreResult<Vec<Book>>;
}

/// Build the backend selected by `config`. A SQLite file is created with its
/// schema when it does not exist yet.
pub fn open_storage(config: &StorageConfig) -> StoreResult<Arc<dyn Storage>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
    }
}
