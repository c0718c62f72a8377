//! Hand-written collaborators for answering tests.

use crate::vector_store::{DocumentInfo, VectorStore};
use heyrag_core::{AppError, AppResult, Passage};
use heyrag_llm::{ChatModel, ChatRequest, TokenStream};
use std::sync::Mutex;

/// Chat model replaying a fixed token list.
pub struct ScriptedChatModel {
    tokens: Vec<String>,

    /// Fail after this many streamed tokens
    fail_after: Option<usize>,

    /// Last request seen
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            fail_after: None,
            last_request: Mutex::new(None),
        }
    }

    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn last_request(&self) -> ChatRequest {
        self.last_request
            .lock()
            .unwrap()
            .clone()
            .expect("model was never called")
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedChatModel {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> AppResult<String> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self.tokens.concat())
    }

    async fn chat_stream(&self, request: &ChatRequest) -> AppResult<TokenStream> {
        *self.last_request.lock().unwrap() = Some(request.clone());

        let mut items: Vec<AppResult<String>> = self.tokens.iter().cloned().map(Ok).collect();
        if let Some(count) = self.fail_after {
            items.truncate(count);
            items.push(Err(AppError::Upstream("model went away".to_string())));
        }

        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        Ok(vec!["scripted".to_string()])
    }
}

/// Store answering every query with the same passages.
pub struct FixedStore {
    passages: Vec<Passage>,
}

impl FixedStore {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self { passages }
    }
}

#[async_trait::async_trait]
impl VectorStore for FixedStore {
    async fn query(&self, _embedding: &[f32], top_k: usize) -> AppResult<Vec<Passage>> {
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }

    async fn add_documents(&self, _passages: &[Passage]) -> AppResult<()> {
        Ok(())
    }

    async fn delete_document(&self, _document_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn list_documents(&self) -> AppResult<Vec<DocumentInfo>> {
        Ok(Vec::new())
    }
}

/// Store whose search backend is down.
pub struct BrokenStore;

#[async_trait::async_trait]
impl VectorStore for BrokenStore {
    async fn query(&self, _embedding: &[f32], _top_k: usize) -> AppResult<Vec<Passage>> {
        Err(AppError::Upstream("search unavailable".to_string()))
    }

    async fn add_documents(&self, _passages: &[Passage]) -> AppResult<()> {
        Err(AppError::Upstream("search unavailable".to_string()))
    }

    async fn delete_document(&self, _document_id: &str) -> AppResult<()> {
        Err(AppError::Upstream("search unavailable".to_string()))
    }

    async fn list_documents(&self) -> AppResult<Vec<DocumentInfo>> {
        Err(AppError::Upstream("search unavailable".to_string()))
    }
}

pub fn geo_passage() -> Passage {
    Passage::new("Paris is the capital of France.", 0.2)
        .with_metadata("filename", "geo.pdf")
        .with_metadata("chunk_index", 0)
        .with_metadata("document_id", "doc-geo")
}
