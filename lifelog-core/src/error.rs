//! Error types for Lifelog

use thiserror::Error;

/// Result type alias using Lifelog's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in Lifelog
#[derive(Error, Debug)]
pub enum Error {
    /// Entry input rejected before any state was touched
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Microphone permission denied or no capture device present
    #[error("Device access failed: {0}")]
    DeviceAccess(String),

    /// Operation not allowed from the current capture state
    #[error("Invalid capture state: {0}")]
    InvalidState(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
