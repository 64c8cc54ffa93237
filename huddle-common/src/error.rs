//! Error types shared across the Huddle Up services
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for Huddle Up services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Coaching backend exchange errors
    #[error("Coach error: {0}")]
    Coach(String),

    /// Audio chunk decoding errors
    #[error("Chunk decode error: {0}")]
    Decode(String),

    /// Media sink transfer errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the shared Error
pub type Result<T> = std::result::Result<T, Error>;
