//! Concrete collaborators wired from configuration.

use heyrag_core::{config::AppConfig, AppResult};
use heyrag_knowledge::{
    create_provider, ChromaStore, ConversationStore, JsonlConversationStore, RagService,
    Retriever,
};
use heyrag_llm::{create_client, ChatModel};
use std::sync::Arc;

pub fn chat_model(config: &AppConfig) -> AppResult<Arc<dyn ChatModel>> {
    create_client("ollama", Some(config.ollama.url.as_str()))
}

/// Ollama embeddings, Chroma search, Ollama chat.
pub fn rag_service(config: &AppConfig) -> AppResult<RagService> {
    let embedder = create_provider("ollama", &config.ollama.embedding_model, &config.ollama.url)?;
    let store = Arc::new(ChromaStore::new(&config.chroma.url, &config.chroma.collection));
    let retriever = Retriever::new(embedder, store);

    Ok(RagService::new(retriever, chat_model(config)?).with_top_k(config.rag.top_k))
}

pub fn conversation_store(config: &AppConfig) -> Arc<dyn ConversationStore> {
    Arc::new(JsonlConversationStore::new(config.conversations_dir()))
}
