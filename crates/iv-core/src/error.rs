//! # AppError
//!
//! Centralized error handling for the IdeaVault ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all iv-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Mutation target absent, or present but outside the caller's
    /// owner scope (the two are indistinguishable on purpose).
    #[error("{0} not found with id {1}")]
    NotFound(String, String),

    /// Malformed input (e.g., empty required text, unrecognized mood)
    #[error("validation error: {0}")]
    Validation(String),

    /// No active user, bad credentials, or an unknown session token
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The backing data store cannot be reached
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Object storage failure (upload or removal)
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else that should never surface to a user verbatim
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for IdeaVault logic.
pub type Result<T> = std::result::Result<T, AppError>;
