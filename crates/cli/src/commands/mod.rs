//! Command handlers for the HeyRAG CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod conversations;
pub mod models;
pub mod voice;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use conversations::ConversationsCommand;
pub use models::ModelsCommand;
pub use voice::VoiceCommand;
