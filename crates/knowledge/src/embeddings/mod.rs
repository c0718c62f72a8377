//! Embedder capability.
//!
//! Retrieval only needs `embed`; `embed_batch` is the primitive providers
//! implement.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{KeywordEmbedder, OllamaProvider};
