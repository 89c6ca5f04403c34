//! Error types for playdeck
//!
//! Defines crate-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the playdeck controller
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Media engine call errors (load/play/pause/seek rejected or failed)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Remote session call errors (transport failure, collaborator gone)
    #[error("Remote session error: {0}")]
    Remote(String),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using playdeck Error
pub type Result<T> = std::result::Result<T, Error>;
