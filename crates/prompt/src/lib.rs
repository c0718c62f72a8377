//! Prompt composition for HeyRAG.
//!
//! Turns retrieved passages, the conversation history and an optional
//! instruction override into the ordered message log sent to the chat model,
//! and derives the provenance list reported once an answer completes.

pub mod composer;
pub mod types;

// Re-export main API
pub use composer::{compose, extract_sources};
pub use types::{DEFAULT_INSTRUCTION, DEFAULT_INSTRUCTION_NO_DOCS};
