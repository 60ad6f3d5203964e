//! Shutdown coordination for the service.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// Cloneable handle over a cancellation token that every long-running task
/// observes. Triggering is idempotent and a task that starts waiting after
/// the trigger returns immediately.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    /// Owned variant of [`Shutdown::wait`] for `'static` futures.
    pub async fn wait_owned(self) {
        self.token.cancelled_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_late_waiter_sees_trigger() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        shutdown.trigger();

        let waited = tokio::time::timeout(Duration::from_secs(1), shutdown.clone().wait_owned()).await;
        assert!(waited.is_ok());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let shutdown = Shutdown::new();
        let observer = shutdown.clone();
        let waiter = tokio::spawn(async move { observer.wait().await });

        shutdown.trigger();
        assert!(tokio::time::timeout(Duration::from_secs(1), waiter).await.is_ok());
    }
}
