//! # AppError
//!
//! Centralized error handling for the Rusty-Blog ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// Why a login attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFault {
    UnknownEmail,
    WrongPassword,
}

/// The primary error type for all rb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Registration with an email that already has an account
    #[error("an account already exists for {0}")]
    DuplicateEmail(String),

    /// Post title already taken by another post
    #[error("a post titled {0:?} already exists")]
    DuplicateTitle(String),

    /// Login refused
    #[error("invalid credentials: {0:?}")]
    InvalidCredentials(CredentialFault),

    /// Missing session or missing capability
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Validation failure (e.g., empty title, malformed email)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

/// Ports speak `anyhow`. Adapters may smuggle a typed `AppError` through it
/// (e.g. a unique-constraint race); recover it here, anything else is internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Internal(format!("{other:#}")),
        }
    }
}

/// A specialized Result type for Rusty-Blog logic.
pub type Result<T> = std::result::Result<T, AppError>;
