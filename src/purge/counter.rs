//! Deletion signal counters.
//!
//! One counter per record kind accumulates "a soft delete just happened"
//! signals until the purger drains them.
//!
//! # Design Decisions
//! - Saturating atomic count: `signal()` never blocks a request handler
//! - Drains are all-or-nothing compare-and-swap, so no signal is lost or
//!   counted twice
//! - Wake-ups go through `Notify`, which keeps a permit when nobody is
//!   waiting, so a signal between "check count" and "wait" is not missed

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::domain::RecordKind;
use crate::observability::metrics;

/// Accumulated soft-delete signals for one record kind.
#[derive(Debug)]
pub struct DeletionCounter {
    kind: RecordKind,
    pending: AtomicU64,
    notify: Notify,
}

impl DeletionCounter {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            pending: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Record one successful soft delete and wake the purger.
    pub fn signal(&self) {
        let mut prev = self.pending.load(Ordering::Relaxed);
        loop {
            match self.pending.compare_exchange_weak(
                prev,
                prev.saturating_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => prev = actual,
            }
        }
        metrics::record_deletion_signal(self.kind, prev.saturating_add(1));
        self.notify.notify_one();
    }

    /// Signals accumulated and not yet drained.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume exactly `n` signals if at least `n` are pending.
    ///
    /// Returns false, consuming nothing, when fewer than `n` are pending.
    pub fn try_drain(&self, n: u64) -> bool {
        let mut prev = self.pending.load(Ordering::Acquire);
        loop {
            if prev < n {
                return false;
            }
            match self.pending.compare_exchange_weak(
                prev,
                prev - n,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    metrics::record_pending_deletions(self.kind, prev - n);
                    return true;
                }
                Err(actual) => prev = actual,
            }
        }
    }

    /// Wait until the next signal (or a signal that arrived while nobody
    /// was waiting).
    pub async fn notified(&self) {
        self.notify.notified().await
    }
}

/// The books and users counters, shared by handlers and the purger.
#[derive(Debug, Clone)]
pub struct DeletionSignals {
    books: Arc<DeletionCounter>,
    users: Arc<DeletionCounter>,
}

impl DeletionSignals {
    pub fn new() -> Self {
        Self {
            books: Arc::new(DeletionCounter::new(RecordKind::Books)),
            users: Arc::new(DeletionCounter::new(RecordKind::Users)),
        }
    }

    pub fn counter(&self, kind: RecordKind) -> &DeletionCounter {
        match kind {
            RecordKind::Books => &self.books,
            RecordKind::Users => &self.users,
        }
    }

    /// Shorthand for `counter(kind).signal()`.
    pub fn signal(&self, kind: RecordKind) {
        self.counter(kind).signal();
    }

    pub fn pending(&self, kind: RecordKind) -> u64 {
        self.counter(kind).pending()
    }
}

impl Default for DeletionSignals {
    fn default() -> Self {
        Self::new()
    }
}
