//! Shared utilities for integration testing.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use library_service::config::LibraryConfig;
use library_service::domain::{Book, NewBook, NewUser, RecordKind, User, UserUpdate};
use library_service::lifecycle::{fatal_channel, LifecycleError, LifecycleStatus, Supervisor};
use library_service::storage::{SoftDeleteStore, Storage, StoreError, StoreResult};
use library_service::LibraryServer;

/// A service running under a supervisor on an ephemeral port.
pub struct RunningService {
    pub addr: SocketAddr,
    pub status: LifecycleStatus,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), LifecycleError>>,
}

impl RunningService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver the external stop request and wait for the supervisor.
    pub async fn stop(mut self) -> Result<(), LifecycleError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.join().await
    }

    /// Wait for the supervisor to finish on its own.
    pub async fn join(self) -> Result<(), LifecycleError> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("supervisor did not stop in time")
            .expect("supervisor task panicked")
    }
}

/// Start the full service (supervisor, server, purger) on 127.0.0.1:0.
pub async fn start_service(config: LibraryConfig, store: Arc<dyn Storage>) -> RunningService {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let supervisor = Supervisor::new(config.lifecycle.shutdown_timeout());
    let status = supervisor.status();
    let (fatal, errors) = fatal_channel();
    let server = LibraryServer::new(&config, store, status.clone(), fatal);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serve = server.serve(listener, supervisor.shutdown());
    let handle = tokio::spawn(supervisor.run(serve, errors, async move {
        let _ = stop_rx.await;
    }));

    RunningService {
        addr,
        status,
        stop: Some(stop_tx),
        handle,
    }
}

/// Config with a short shutdown timeout and a fixed test secret.
pub fn test_config() -> LibraryConfig {
    let mut config = LibraryConfig::default();
    config.auth.jwt_secret = "integration-test-secret".into();
    config.lifecycle.shutdown_timeout_secs = 2;
    config
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// How a failing purge fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeFault {
    Error,
    Panic,
}

/// Store wrapper whose hard purges of one kind always fail.
pub struct FailingPurgeStore<S> {
    inner: Arc<S>,
    failing: RecordKind,
    fault: PurgeFault,
    attempts: AtomicU32,
}

#[allow(dead_code)]
impl<S> FailingPurgeStore<S> {
    pub fn new(inner: Arc<S>, failing: RecordKind) -> Self {
        Self::with_fault(inner, failing, PurgeFault::Error)
    }

    pub fn with_fault(inner: Arc<S>, failing: RecordKind, fault: PurgeFault) -> Self {
        Self {
            inner,
            failing,
            fault,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Storage> SoftDeleteStore for FailingPurgeStore<S> {
    async fn mark_deleted(&self, kind: RecordKind, id: &str) -> StoreResult<()> {
        self.inner.mark_deleted(kind, id).await
    }

    async fn purge_deleted(&self, kind: RecordKind) -> StoreResult<u64> {
        if kind == self.failing {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fault == PurgeFault::Panic {
                panic!("injected purge panic");
            }
            return Err(StoreError::Backend("injected purge failure".into()));
        }
        self.inner.purge_deleted(kind).await
    }
}

#[async_trait]
impl<S: Storage> Storage for FailingPurgeStore<S> {
    async fn save_user(&self, user: NewUser) -> StoreResult<String> {
        self.inner.save_user(user).await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<User> {
        self.inner.user_by_email(email).await
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        self.inner.users().await
    }

    async fn update_user(&self, uid: &str, update: UserUpdate) -> StoreResult<()> {
        self.inner.update_user(uid, update).await
    }

    async fn save_book(&self, book: NewBook) -> StoreResult<String> {
        self.inner.save_book(book).await
    }

    async fn book(&self, bid: &str) -> StoreResult<Book> {
        self.inner.book(bid).await
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        self.inner.books().await
    }

    async fn books_by_user(&self, uid: &str) -> StoreResult<Vec<Book>> {
        self.inner.books_by_user(uid).await
    }
}
