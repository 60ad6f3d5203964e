//! HTTP surface of the library service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, timeout / request id / trace layers)
//!     → users.rs, books.rs (handlers)
//!         → auth (hash, verify, tokens)
//!         → storage (CRUD, soft delete)
//!         → purge::DeletionSignals (after each successful soft delete)
//!     → error.rs (failures rendered as JSON)
//! ```

pub mod books;
pub mod error;
pub mod extract;
pub mod server;
pub mod users;

pub use error::ApiError;
pub use server::{AppState, LibraryServer};
