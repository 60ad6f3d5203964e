//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Hard purge fails:
//!     → FailurePolicy::Retry (purge/purger.rs)
//!     → backoff.rs (exponential delay with jitter)
//!     → retry, or escalate after max_attempts
//! ```
//!
//! # Design Decisions
//! - Jittered backoff prevents hammering a struggling store
//! - Backoff waits are cancellable by shutdown

pub mod backoff;

pub use backoff::Backoff;
