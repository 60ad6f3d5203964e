//! HTTP server setup and the serving loop.
//!
//! # Responsibilities
//! - Create the Axum router with the user, book and health handlers
//! - Wire up middleware (timeout, request id, tracing)
//! - Bind the listener (bind failure ends the run before anything starts)
//! - Own the batch purger for the lifetime of one serving loop
//! - Stop accepting on shutdown and wait for the purger to exit

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenIssuer;
use crate::config::LibraryConfig;
use crate::domain::RecordKind;
use crate::http::{books, users};
use crate::lifecycle::{FatalSender, LifecycleError, LifecycleState, LifecycleStatus, Shutdown};
use crate::purge::{BatchPurger, DeletionSignals, PurgerExit};
use crate::storage::Storage;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub signals: DeletionSignals,
    pub tokens: Arc<TokenIssuer>,
    pub status: LifecycleStatus,
}

/// The library HTTP service plus its background purger.
pub struct LibraryServer {
    router: Router,
    config: LibraryConfig,
    store: Arc<dyn Storage>,
    signals: DeletionSignals,
    fatal: FatalSender,
}

impl LibraryServer {
    /// Create a server. `fatal` is handed to the purger; it is the only
    /// sender, so the error channel closes once the purger exits.
    pub fn new(
        config: &LibraryConfig,
        store: Arc<dyn Storage>,
        status: LifecycleStatus,
        fatal: FatalSender,
    ) -> Self {
        let signals = DeletionSignals::new();
        let state = AppState {
            store: store.clone(),
            signals: signals.clone(),
            tokens: Arc::new(TokenIssuer::new(&config.auth)),
            status,
        };
        let router = Self::build_router(config, state);

        Self {
            router,
            config: config.clone(),
            store,
            signals,
            fatal,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &LibraryConfig, state: AppState) -> Router {
        let user_routes = Router::new()
            .route("/register", post(users::register))
            .route("/auth", post(users::login))
            .route("/get_all_users", get(users::all_users))
            .route("/update_user/{id}", put(users::update_user))
            .route("/delete/{id}", delete(users::delete_user));

        let book_routes = Router::new()
            .route("/my-books", get(books::my_books))
            .route("/all_books", get(books::all_books))
            .route("/add_book", post(books::add_book))
            .route("/delete/{id}", delete(books::delete_book))
            .route("/{id}", get(books::book));

        Router::new()
            .route("/health", get(health))
            .nest("/user", user_routes)
            .nest("/book", book_routes)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Signals shared with the handlers.
    pub fn signals(&self) -> DeletionSignals {
        self.signals.clone()
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured address and serve until `shutdown` fires.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), LifecycleError> {
        let address = self.config.listener.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| LifecycleError::Bind { address, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// The purger starts only once the listener exists and is always
    /// awaited before returning.
    pub async fn serve(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), LifecycleError> {
        let addr = listener.local_addr().map_err(LifecycleError::Serve)?;
        tracing::info!(address = %addr, "HTTP server starting");

        let purger = BatchPurger::new(
            self.store,
            self.signals,
            self.config.purge.clone(),
            self.fatal,
        );
        let purger = tokio::spawn(purger.run(shutdown.clone()));

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.clone().wait_owned())
            .await;

        // Also covers the serve loop failing on its own.
        shutdown.trigger();
        let joined = purger.await;
        served.map_err(LifecycleError::Serve)?;

        match joined {
            Ok(PurgerExit::Cancelled) => tracing::debug!("Purger joined"),
            Ok(PurgerExit::Failed) => tracing::debug!("Purger joined after failure"),
            // The purger's sender died with it, so the error observer saw a
            // clean close. The panic has to surface here.
            Err(e) => {
                tracing::error!(error = %e, "Batch purger task died");
                return Err(LifecycleError::Task(format!("batch purger: {e}")));
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PendingDeletions {
    books: u64,
    users: u64,
}

#[derive(Debug, Serialize)]
struct HealthReport {
    version: &'static str,
    state: LifecycleState,
    pending: PendingDeletions,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        version: env!("CARGO_PKG_VERSION"),
        state: state.status.get(),
        pending: PendingDeletions {
            books: state.signals.pending(RecordKind::Books),
            users: state.signals.pending(RecordKind::Users),
        },
    })
}
