//! Error types for the rategate service.

use thiserror::Error;

/// Main error type for rategate operations.
#[derive(Error, Debug)]
pub enum RategateError {
    /// The rule document violates its shape constraints
    #[error("Rule validation error: {0}")]
    Validation(String),

    /// A counter store call failed, timed out, or returned garbage
    #[error("Counter store error: {0}")]
    Store(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for rategate operations.
pub type Result<T> = std::result::Result<T, RategateError>;
