//! # Intake Error Types
//!
//! Typed error handling for craft-intake.
//! Every fallible intake operation returns `Result<T, IntakeError>`.

use thiserror::Error;

/// Core error type for all intake operations
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Missing or malformed caller input
    #[error("{0}")]
    Validation(String),

    /// Webhook signature verification failed
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),

    /// Payment provider or mail relay failure
    #[error("{service} error: {message}")]
    Upstream { service: String, message: String },

    /// Configuration errors (missing keys, invalid settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        IntakeError::Validation(message.into())
    }

    /// Shorthand for an upstream failure from `service`
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        IntakeError::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            IntakeError::Validation(_) => 400,
            IntakeError::InvalidSignature(_) => 400,
            IntakeError::Upstream { .. } => 500,
            IntakeError::Configuration(_) => 500,
            IntakeError::Internal(_) => 500,
        }
    }
}

/// Result type alias for intake operations
pub type IntakeResult<T> = Result<T, IntakeError>;
