//! Error types for HeyRAG.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! upstream collaborators (embedding, search, chat model, speech), session
//! timeouts and rejected input.

use thiserror::Error;

/// Unified error type for HeyRAG.
///
/// All library functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An embedding, vector search, chat model, STT or TTS call failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Referenced conversation (or other persisted entity) is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// A client did not deliver an expected message in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Input was received but cannot be processed (e.g. audio too short)
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Prompt composition errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
