//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → environment / CLI overrides (main.rs)
//!     → LibraryConfig (validated, immutable)
//!     → handed by value to the server, purger and supervisor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets live in the config value, never in process-wide statics

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, FailurePolicy, LibraryConfig, LifecycleConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, PurgeConfig, StorageBackend, StorageConfig, TimeoutConfig,
    DEFAULT_JWT_SECRET,
};
pub use validation::{validate_config, ValidationError};
