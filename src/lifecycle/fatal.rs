//! Single-slot channel carrying a fatal error to the supervisor.

use tokio::sync::mpsc;

use crate::lifecycle::LifecycleError;

/// Create the fatal error channel.
///
/// Holds at most one undelivered error. The channel closes when the last
/// [`FatalSender`] is dropped, which the receiver reads as a clean exit.
pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (FatalSender { tx }, FatalReceiver { rx })
}

/// Sending half, held by background tasks.
#[derive(Debug, Clone)]
pub struct FatalSender {
    tx: mpsc::Sender<LifecycleError>,
}

impl FatalSender {
    /// Hand an error to the supervisor.
    ///
    /// If the supervisor has already stopped listening the error is logged
    /// and dropped.
    pub async fn report(&self, err: LifecycleError) {
        if let Err(mpsc::error::SendError(err)) = self.tx.send(err).await {
            tracing::warn!(error = %err, "Fatal error reported after supervisor stopped observing");
        }
    }
}

/// Receiving half, owned by the supervisor's error observer.
#[derive(Debug)]
pub struct FatalReceiver {
    rx: mpsc::Receiver<LifecycleError>,
}

impl FatalReceiver {
    /// Next fatal error, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<LifecycleError> {
        self.rx.recv().await
    }

    /// Non-blocking variant; `None` when nothing is waiting.
    pub fn try_recv(&mut self) -> Option<LifecycleError> {
        self.rx.try_recv().ok()
    }
}
