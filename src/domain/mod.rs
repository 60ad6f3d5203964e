//! Domain model for the library catalog.
//!
//! # Record Lifecycle
//! ```text
//! Active ──(delete request)──▶ SoftDeleted ──(batch purge)──▶ Purged
//! ```
//!
//! # Design Decisions
//! - A soft-deleted record keeps its row but is invisible to every read
//! - Only the batch purger moves a record to Purged (terminal)

pub mod models;

pub use models::{Book, NewBook, NewUser, RecordKind, User, UserUpdate};
