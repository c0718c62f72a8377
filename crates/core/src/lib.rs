//! HeyRAG Core Library
//!
//! This crate provides the foundational utilities shared by every HeyRAG crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Shared data model (`Passage`, `SourceRef`)

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use types::{Passage, SourceRef};
