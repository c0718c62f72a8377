//! Chat model abstraction and request types.
//!
//! This module defines the core abstractions for talking to a chat-completion
//! provider: the message log, the request, and the `ChatModel` capability.

use futures::Stream;
use heyrag_core::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::pin::Pin;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of a conversation turn log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Provider-specific generation options (temperature, num_ctx, ...).
pub type ChatOptions = Map<String, Value>;

/// Chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Ordered message log, system message first
    pub messages: Vec<ChatMessage>,

    /// Model identifier (e.g., "llama3.2")
    pub model: String,

    /// Generation options forwarded untouched to the provider
    #[serde(default)]
    pub options: ChatOptions,
}

impl ChatRequest {
    /// Create a new chat request with required fields.
    pub fn new(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            options: ChatOptions::new(),
        }
    }

    /// Replace all generation options.
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options
            .insert("temperature".to_string(), Value::from(temperature));
        self
    }
}

/// Summary of an installed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,

    /// Context window in tokens
    pub num_ctx: u64,
}

/// Context window assumed when a provider does not report one.
pub const DEFAULT_NUM_CTX: u64 = 4096;

/// Lazy sequence of generated text tokens.
pub type TokenStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Box a stream of tokens, fixing its item type for `try_stream!` bodies.
pub fn boxed_token_stream<S>(stream: S) -> TokenStream
where
    S: Stream<Item = AppResult<String>> + Send + 'static,
{
    Box::pin(stream)
}

/// Trait for chat-completion providers.
///
/// The orchestration layer depends only on this trait, so any backend (or a
/// scripted test double) can stand behind it.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Get the provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion and return the full answer.
    async fn chat(&self, request: &ChatRequest) -> AppResult<String>;

    /// Perform a streaming completion.
    ///
    /// Tokens are yielded in generation order; concatenating them yields the answer.
    async fn chat_stream(&self, request: &ChatRequest) -> AppResult<TokenStream>;

    /// List chat models (embedding models excluded).
    async fn list_models(&self) -> AppResult<Vec<String>>;

    /// Describe a model, falling back to [`DEFAULT_NUM_CTX`].
    async fn model_info(&self, model: &str) -> AppResult<ModelInfo> {
        Ok(ModelInfo {
            name: model.to_string(),
            num_ctx: DEFAULT_NUM_CTX,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let message = ChatMessage::assistant("Bonjour");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "Bonjour");
        assert_eq!(Role::System.as_str(), "system");
    }

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new(vec![ChatMessage::user("Hi")], "llama3.2")
            .with_temperature(0.5);

        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.options["temperature"], serde_json::json!(0.5));
    }
}
