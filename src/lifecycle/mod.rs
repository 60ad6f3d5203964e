//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor (supervisor.rs):
//!     spawn {serve, error observer, shutdown trigger}
//!     → first to finish triggers Shutdown
//!     → remaining tasks unwind within shutdown_timeout
//!     → first error (if any) is the process result
//!
//! Fatal errors (fatal.rs):
//!     background task failure → FatalSender → error observer
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/SIGQUIT → shutdown trigger
//! ```
//!
//! # Design Decisions
//! - Structured concurrency: the supervisor owns every task it starts
//! - Cancellation is cooperative; tasks that overstay the deadline are aborted
//! - Only the supervisor mutates the lifecycle state

pub mod error;
pub mod fatal;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod supervisor;

pub use error::LifecycleError;
pub use fatal::{fatal_channel, FatalReceiver, FatalSender};
pub use shutdown::Shutdown;
pub use state::{LifecycleState, LifecycleStatus};
pub use supervisor::Supervisor;
