//! Chat model integration crate for HeyRAG.
//!
//! This crate provides a provider-agnostic abstraction for chat-completion
//! models: a role-tagged message log, a request type carrying free-form
//! generation options, and the `ChatModel` trait with streaming support.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use futures::StreamExt;
//! use heyrag_llm::{ChatMessage, ChatModel, ChatRequest, OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = ChatRequest::new(vec![ChatMessage::user("Hello!")], "llama3.2");
//! let mut tokens = client.chat_stream(&request).await?;
//! while let Some(token) = tokens.next().await {
//!     print!("{}", token?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    boxed_token_stream, ChatMessage, ChatModel, ChatOptions, ChatRequest, ModelInfo, Role,
    TokenStream, DEFAULT_NUM_CTX,
};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::ProviderType;
