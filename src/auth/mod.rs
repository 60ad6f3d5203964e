//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! register/auth handlers:
//!     → password.rs (hash on register, verify on login)
//!     → token.rs (issue JWT, returned in the `authorization` header)
//!
//! book handlers:
//!     → http/extract.rs (bearer token) → token.rs (verify) → user id
//! ```
//!
//! # Design Decisions
//! - The signing secret comes from `AuthConfig`; there is no global key
//! - HS256 tokens carry the user id as subject

pub mod password;
pub mod token;

use thiserror::Error;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};

/// Errors from hashing or token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
