//! Embedding provider trait and factory.

use heyrag_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Upstream("No embedding returned".to_string()))
    }
}

/// Create an embedding provider by name.
///
/// `base_url` is only used by HTTP-backed providers. The `mock` provider reads
/// `model` as a comma-separated keyword list.
pub fn create_provider(
    provider: &str,
    model: &str,
    base_url: &str,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match provider {
        "ollama" => Ok(Arc::new(super::providers::ollama::OllamaProvider::new(
            base_url, model,
        )?)),

        "mock" => Ok(Arc::new(
            super::providers::keyword::KeywordEmbedder::from_model(model)?,
        )),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, mock",
            provider
        ))),
    }
}
