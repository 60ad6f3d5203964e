//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::RecordKind;

/// Root configuration for the library service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LibraryConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Token signing settings.
    pub auth: AuthConfig,

    /// Record storage backend.
    pub storage: StorageConfig,

    /// Batch purge settings.
    pub purge: PurgeConfig,

    /// Process lifecycle settings.
    pub lifecycle: LifecycleConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// JWT issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify tokens.
    pub jwt_secret: String,

    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

/// Placeholder secret; startup warns when it is still in use.
pub const DEFAULT_JWT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Which store holds the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process memory; everything is lost on exit.
    Memory,
    /// A SQLite database file.
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Database file, used by the `sqlite` backend.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: "library.db".to_string(),
        }
    }
}

/// What the purger does when a hard purge fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and stop purging.
    Fatal,
    /// Log the failure and keep purging.
    LogAndContinue,
    /// Retry with exponential backoff; after `max_attempts` failures, fatal.
    Retry {
        max_attempts: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Retry {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Batch purge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PurgeConfig {
    /// Soft deletes of one kind that trigger a purge of that kind.
    pub threshold: u64,

    /// Failure handling for book purges.
    pub books: FailurePolicy,

    /// Failure handling for user purges.
    pub users: FailurePolicy,
}

impl PurgeConfig {
    pub fn policy_for(&self, kind: RecordKind) -> FailurePolicy {
        match kind {
            RecordKind::Books => self.books,
            RecordKind::Users => self.users,
        }
    }
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            books: FailurePolicy::default(),
            users: FailurePolicy::default(),
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long tasks may take to unwind after shutdown starts.
    pub shutdown_timeout_secs: u64,
}

impl LifecycleConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: LibraryConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.purge.threshold, 2);
        assert_eq!(config.purge.books, config.purge.users);
        assert_eq!(config.lifecycle.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_sqlite_storage_parses() {
        let config: LibraryConfig =
            toml::from_str("[storage]\nbackend = \"sqlite\"\npath = \"/var/lib/library.db\"").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, "/var/lib/library.db");
    }

    #[test]
    fn test_failure_policies_parse() {
        let config: LibraryConfig = toml::from_str(
            r#"
            [purge]
            threshold = 5
            books = { mode = "fatal" }

            [purge.users]
            mode = "retry"
            max_attempts = 4
            base_delay_ms = 50
            max_delay_ms = 400
            "#,
        )
        .unwrap();

        assert_eq!(config.purge.threshold, 5);
        assert_eq!(config.purge.policy_for(RecordKind::Books), FailurePolicy::Fatal);
        assert_eq!(
            config.purge.policy_for(RecordKind::Users),
            FailurePolicy::Retry {
                max_attempts: 4,
                base_delay_ms: 50,
                max_delay_ms: 400,
            }
        );
    }

    #[test]
    fn test_log_and_continue_parses() {
        let config: LibraryConfig =
            toml::from_str("[purge]\nusers = { mode = \"log_and_continue\" }").unwrap();
        assert_eq!(config.purge.users, FailurePolicy::LogAndContinue);
    }
}
