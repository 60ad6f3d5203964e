//! Supervision of the serving process group.
//!
//! # Tasks
//! - Serve: the request-accepting loop (owns the batch purger)
//! - Error observer: waits on the fatal error channel
//! - Shutdown trigger: waits on the external stop signal
//!
//! # Termination
//! ```text
//! first task finishes → trigger shutdown → unwind the rest (bounded)
//! result = first error in completion order, else Ok
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};

use crate::lifecycle::fatal::FatalReceiver;
use crate::lifecycle::state::{LifecycleCell, LifecycleState, LifecycleStatus};
use crate::lifecycle::{LifecycleError, Shutdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Serve,
    ErrorObserver,
    ShutdownTrigger,
}

type TaskOutput = (Task, Result<(), LifecycleError>);

/// Runs the serving loop, error observer and shutdown trigger as one group.
pub struct Supervisor {
    shutdown: Shutdown,
    shutdown_timeout: Duration,
    state: LifecycleCell,
}

impl Supervisor {
    /// Create a supervisor that waits at most `shutdown_timeout` for tasks
    /// to unwind once shutdown starts.
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            shutdown: Shutdown::new(),
            shutdown_timeout,
            state: LifecycleCell::new(),
        }
    }

    /// Handle the serving loop (and anything it spawns) must observe.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Read-only view of the lifecycle state.
    pub fn status(&self) -> LifecycleStatus {
        self.state.status()
    }

    /// Run all tasks to completion.
    ///
    /// `serve` should return once the handle from [`Supervisor::shutdown`]
    /// fires. `stop` resolves on an external stop request (OS signal).
    pub async fn run<F, S>(
        self,
        serve: F,
        errors: FatalReceiver,
        stop: S,
    ) -> Result<(), LifecycleError>
    where
        F: Future<Output = Result<(), LifecycleError>> + Send + 'static,
        S: Future<Output = ()> + Send + 'static,
    {
        self.state.set(LifecycleState::Running);

        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        tasks.spawn(async move { (Task::Serve, serve.await) });
        tasks.spawn(observe_errors(errors, self.shutdown.clone()));
        tasks.spawn(trigger_shutdown(stop, self.shutdown.clone()));

        let mut outcome = Ok(());
        if let Some(joined) = tasks.join_next().await {
            let task = merge(&mut outcome, joined);
            tracing::info!(task = ?task, failed = outcome.is_err(), "Supervised task finished, shutting down");
        }

        self.state.set(LifecycleState::ShuttingDown);
        self.shutdown.trigger();

        let deadline = tokio::time::sleep(self.shutdown_timeout);
        tokio::pin!(deadline);
        let mut timed_out = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => {
                        let task = merge(&mut outcome, joined);
                        tracing::debug!(task = ?task, "Supervised task unwound");
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            tracing::warn!(
                timeout = ?self.shutdown_timeout,
                remaining = tasks.len(),
                "Graceful shutdown timed out, abandoning remaining tasks"
            );
            tasks.shutdown().await;
        }

        self.state.set(LifecycleState::Stopped);
        match &outcome {
            Ok(()) => tracing::info!("All supervised tasks stopped"),
            Err(e) => tracing::error!(error = %e, "Supervised tasks stopped with error"),
        }
        outcome
    }
}

/// Fold one task result into the aggregate, keeping the first error.
fn merge(
    outcome: &mut Result<(), LifecycleError>,
    joined: Result<TaskOutput, JoinError>,
) -> Option<Task> {
    let (task, result) = match joined {
        Ok((task, result)) => (Some(task), result),
        Err(e) if e.is_cancelled() => return None,
        Err(e) => (None, Err(LifecycleError::Task(e.to_string()))),
    };
    if let Err(e) = result {
        if outcome.is_ok() {
            *outcome = Err(e);
        } else {
            tracing::warn!(error = %e, "Additional error during shutdown");
        }
    }
    task
}

async fn observe_errors(mut errors: FatalReceiver, shutdown: Shutdown) -> TaskOutput {
    let result = tokio::select! {
        received = errors.recv() => match received {
            Some(err) => Err(err),
            None => Ok(()),
        },
        _ = shutdown.wait() => Ok(()),
    };
    (Task::ErrorObserver, result)
}

async fn trigger_shutdown<S>(stop: S, shutdown: Shutdown) -> TaskOutput
where
    S: Future<Output = ()>,
{
    tokio::select! {
        _ = stop => tracing::info!("Stop requested, starting graceful shutdown"),
        _ = shutdown.wait() => {}
    }
    shutdown.trigger();
    (Task::ShutdownTrigger, Ok(()))
}
