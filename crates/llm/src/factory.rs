//! Chat model factory.
//!
//! Resolves a provider name from configuration into a shared `ChatModel`.

use crate::client::ChatModel;
use crate::providers::OllamaClient;
use crate::types::ProviderType;
use heyrag_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a chat model client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown.
pub fn create_client(provider: &str, endpoint: Option<&str>) -> AppResult<Arc<dyn ChatModel>> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        None => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}
