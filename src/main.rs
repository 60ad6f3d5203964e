//! Library service
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ handlers ──▶ storage
//!                                          │
//!                                          ▼ soft delete
//!                                   deletion signals
//!                                          │ threshold reached
//!                                          ▼
//!                                    batch purger ──▶ storage (hard purge)
//!                                          │ escalated failure
//!                                          ▼
//!                       supervisor ◀── error channel
//!                           ▲
//!     SIGINT/SIGTERM ───────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use library_service::config::{
    load_config, validate_config, ConfigError, LibraryConfig, StorageBackend, DEFAULT_JWT_SECRET,
};
use library_service::lifecycle::{fatal_channel, signals, Supervisor};
use library_service::observability::{logging, metrics};
use library_service::purge::sweep_leftovers;
use library_service::storage::open_storage;
use library_service::LibraryServer;

#[derive(Parser, Debug)]
#[command(name = "library-service")]
#[command(about = "Library records service with deferred batch purging", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "LIBRARY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// JWT signing secret, overrides `auth.jwt_secret`.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// SQLite database file; selects the sqlite backend.
    #[arg(long, env = "DB_PATH")]
    db_path: Option<String>,

    /// Soft deletes that trigger a purge, overrides `purge.threshold`.
    #[arg(long, env = "PURGE_THRESHOLD")]
    purge_threshold: Option<u64>,

    /// Force debug logging.
    #[arg(long, env = "DEBUG")]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut LibraryConfig) {
        if let Some(host) = &self.host {
            config.listener.bind_address = host.clone();
        }
        if let Some(secret) = &self.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }
        if let Some(path) = &self.db_path {
            config.storage.backend = StorageBackend::Sqlite;
            config.storage.path = path.clone();
        }
        if let Some(threshold) = self.purge_threshold {
            config.purge.threshold = threshold;
        }
        if self.debug {
            config.observability.log_level = "debug".to_string();
        }
    }
}

fn build_config(args: &Args) -> Result<LibraryConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => LibraryConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("library-service: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "library-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage = ?config.storage.backend,
        purge_threshold = config.purge.threshold,
        request_timeout_secs = config.timeouts.request_secs,
        shutdown_timeout_secs = config.lifecycle.shutdown_timeout_secs,
        "Configuration loaded"
    );

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT secret is the built-in placeholder; set JWT_SECRET or auth.jwt_secret");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = match open_storage(&config.storage) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, path = %config.storage.path, "Failed to open storage");
            return ExitCode::FAILURE;
        }
    };
    sweep_leftovers(store.as_ref()).await;

    let supervisor = Supervisor::new(config.lifecycle.shutdown_timeout());
    let (fatal, errors) = fatal_channel();
    let server = LibraryServer::new(&config, store, supervisor.status(), fatal);

    let serve = server.run(supervisor.shutdown());
    match supervisor
        .run(serve, errors, signals::wait_for_termination())
        .await
    {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "library-service exited with error");
            ExitCode::FAILURE
        }
    }
}
