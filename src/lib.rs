//! Library service: user and book records over HTTP, with deferred batch
//! purging of soft-deleted rows under a supervised lifecycle.

// Core subsystems
pub mod config;
pub mod domain;
pub mod http;
pub mod storage;

// Background work
pub mod purge;

// Cross-cutting concerns
pub mod auth;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::LibraryConfig;
pub use http::LibraryServer;
pub use lifecycle::{Shutdown, Supervisor};
