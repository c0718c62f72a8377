//! Chat model providers.

pub mod ollama;

pub use ollama::OllamaClient;
