//! Batch purger.
//!
//! # States
//! ```text
//! Idle → Purging:    a counter reaches the threshold
//! Purging → Idle:    purge succeeded (or failed under LogAndContinue)
//! Purging → Failed:  policy escalated the failure (terminal)
//! any → exit:        shutdown triggered
//! ```

use std::sync::Arc;

use crate::config::{FailurePolicy, PurgeConfig};
use crate::domain::RecordKind;
use crate::lifecycle::{FatalSender, LifecycleError, Shutdown};
use crate::observability::metrics;
use crate::purge::counter::DeletionSignals;
use crate::resilience::Backoff;
use crate::storage::SoftDeleteStore;

/// Why the purger loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgerExit {
    /// Shutdown was triggered. Pending signals are dropped.
    Cancelled,
    /// A purge failure was escalated through the fatal channel.
    Failed,
}

/// Background task that hard-purges soft-deleted records in batches.
pub struct BatchPurger<S: ?Sized> {
    store: Arc<S>,
    signals: DeletionSignals,
    config: PurgeConfig,
    fatal: FatalSender,
}

impl<S> BatchPurger<S>
where
    S: SoftDeleteStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        signals: DeletionSignals,
        config: PurgeConfig,
        fatal: FatalSender,
    ) -> Self {
        Self {
            store,
            signals,
            config,
            fatal,
        }
    }

    /// Run the purge loop until shutdown or an escalated failure.
    pub async fn run(self, shutdown: Shutdown) -> PurgerExit {
        let threshold = self.config.threshold.max(1);
        tracing::info!(
            threshold,
            books_policy = ?self.config.books,
            users_policy = ?self.config.users,
            "Batch purger starting"
        );

        let exit = loop {
            if shutdown.is_triggered() {
                break PurgerExit::Cancelled;
            }

            if let Err(err) = self.purge_ready(threshold, &shutdown).await {
                self.fatal.report(err).await;
                break PurgerExit::Failed;
            }

            tokio::select! {
                biased;
                _ = shutdown.wait() => {}
                _ = self.signals.counter(RecordKind::Books).notified() => {}
                _ = self.signals.counter(RecordKind::Users).notified() => {}
            }
        };

        match exit {
            PurgerExit::Cancelled => tracing::info!(
                pending_books = self.signals.pending(RecordKind::Books),
                pending_users = self.signals.pending(RecordKind::Users),
                "Batch purger stopped"
            ),
            PurgerExit::Failed => tracing::error!("Batch purger stopped after fatal purge failure"),
        }
        exit
    }

    /// Purge every kind once per full threshold of pending signals.
    async fn purge_ready(&self, threshold: u64, shutdown: &Shutdown) -> Result<(), LifecycleError> {
        for kind in RecordKind::ALL {
            while !shutdown.is_triggered() && self.signals.counter(kind).try_drain(threshold) {
                self.purge(kind, shutdown).await?;
            }
        }
        Ok(())
    }

    /// One purge cycle for `kind`, applying its failure policy.
    async fn purge(&self, kind: RecordKind, shutdown: &Shutdown) -> Result<(), LifecycleError> {
        let policy = self.config.policy_for(kind);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.store.purge_deleted(kind).await {
                Ok(removed) => {
                    tracing::info!(kind = %kind, removed, "Purged soft-deleted records");
                    metrics::record_purge(kind, "success", removed);
                    return Ok(());
                }
                Err(err) => err,
            };
            metrics::record_purge(kind, "failure", 0);

            match policy {
                FailurePolicy::Fatal => {
                    tracing::error!(kind = %kind, error = %err, "Purge failed");
                    return Err(LifecycleError::Purge {
                        kind,
                        attempts: attempt,
                        source: err,
                    });
                }
                FailurePolicy::LogAndContinue => {
                    tracing::error!(kind = %kind, error = %err, "Purge failed, continuing");
                    return Ok(());
                }
                FailurePolicy::Retry {
                    max_attempts,
                    base_delay_ms,
                    max_delay_ms,
                } => {
                    if attempt >= max_attempts {
                        tracing::error!(kind = %kind, attempt, error = %err, "Purge failed, retries exhausted");
                        return Err(LifecycleError::Purge {
                            kind,
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = Backoff::new(base_delay_ms, max_delay_ms).delay(attempt);
                    tracing::warn!(kind = %kind, attempt, delay = ?delay, error = %err, "Purge failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.wait() => return Ok(()),
                    }
                }
            }
        }
    }
}

/// Hard-purge rows an earlier run left soft-deleted.
///
/// Deletion signals are not persisted, so with a durable store these rows
/// would otherwise wait forever. Failures are logged and the rows stay
/// hidden until the next startup. Returns how many rows were removed.
pub async fn sweep_leftovers<S>(store: &S) -> u64
where
    S: SoftDeleteStore + ?Sized,
{
    let mut total = 0;
    for kind in RecordKind::ALL {
        match store.purge_deleted(kind).await {
            Ok(0) => {}
            Ok(removed) => {
                tracing::info!(kind = %kind, removed, "Swept soft-deleted records left by a previous run");
                metrics::record_purge(kind, "success", removed);
                total += removed;
            }
            Err(err) => {
                tracing::warn!(kind = %kind, error = %err, "Startup sweep failed, rows stay soft-deleted");
                metrics::record_purge(kind, "failure", 0);
            }
        }
    }
    total
}
