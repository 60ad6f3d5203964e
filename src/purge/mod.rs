//! Deferred bulk-purge subsystem.
//!
//! # Data Flow
//! ```text
//! DELETE handler:
//!     → SoftDeleteStore::mark_deleted
//!     → counter.rs (signal the kind's counter)
//!
//! purger.rs (one background task per server run):
//!     wait for {signal, shutdown}
//!     → counter reaches threshold → drain exactly `threshold`
//!     → SoftDeleteStore::purge_deleted(kind)
//!     → on escalated failure: FatalSender → supervisor
//! ```
//!
//! # Design Decisions
//! - Purger sleeps on notifications; no busy polling
//! - Threshold and per-kind failure policy come from `PurgeConfig`
//! - Signals still pending at shutdown are dropped; their rows stay
//!   soft-deleted until `sweep_leftovers` runs at the next startup

pub mod counter;
pub mod purger;

pub use counter::{DeletionCounter, DeletionSignals};
pub use purger::{sweep_leftovers, BatchPurger, PurgerExit};
