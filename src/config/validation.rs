//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (threshold >= 1, timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LibraryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{FailurePolicy, LibraryConfig, StorageBackend};
use crate::domain::RecordKind;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &LibraryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.token_ttl_secs", "must be greater than 0"));
    }

    if config.storage.backend == StorageBackend::Sqlite && config.storage.path.trim().is_empty() {
        errors.push(ValidationError::new(
            "storage.path",
            "must not be empty for the sqlite backend",
        ));
    }

    if config.purge.threshold == 0 {
        errors.push(ValidationError::new("purge.threshold", "must be at least 1"));
    }
    for kind in RecordKind::ALL {
        validate_policy(kind, config.purge.policy_for(kind), &mut errors);
    }

    if config.lifecycle.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "lifecycle.shutdown_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_policy(kind: RecordKind, policy: FailurePolicy, errors: &mut Vec<ValidationError>) {
    if let FailurePolicy::Retry {
        max_attempts,
        base_delay_ms,
        max_delay_ms,
    } = policy
    {
        let field = format!("purge.{}", kind);
        if max_attempts == 0 {
            errors.push(ValidationError::new(
                format!("{field}.max_attempts"),
                "must be at least 1",
            ));
        }
        if base_delay_ms > max_delay_ms {
            errors.push(ValidationError::new(
                format!("{field}.base_delay_ms"),
                "must not exceed max_delay_ms",
            ));
        }
    }
}
