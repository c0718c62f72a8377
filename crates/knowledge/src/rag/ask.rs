//! RAG answering orchestration.
//!
//! Retrieves relevant passages, composes the prompt and asks the chat model,
//! either streaming tokens as they are generated or waiting for the whole
//! answer.

use crate::rag::types::{boxed_events, AskRequest, EventStream, RagAnswer, StreamEvent};
use crate::retrieval::{Retriever, DEFAULT_TOP_K};
use futures::StreamExt;
use heyrag_core::{AppResult, SourceRef};
use heyrag_llm::{ChatModel, ChatRequest};
use heyrag_prompt::{compose, extract_sources};
use std::sync::Arc;

/// Question answering over a document collection.
#[derive(Clone)]
pub struct RagService {
    retriever: Retriever,
    llm: Arc<dyn ChatModel>,
    top_k: usize,
}

impl RagService {
    pub fn new(retriever: Retriever, llm: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            llm,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Number of nearest passages requested per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Stream the answer to one question.
    ///
    /// Yields one `Token` per generated token, in order, then exactly one
    /// `Sources` event, then ends. Nothing runs until the stream is polled,
    /// and each call retrieves afresh. Failures end the stream with an `Err`
    /// item; turning that into a terminal event is the caller's job.
    pub fn ask_stream(&self, request: AskRequest) -> EventStream {
        let retriever = self.retriever.clone();
        let llm = Arc::clone(&self.llm);
        let top_k = self.top_k;

        boxed_events(async_stream::try_stream! {
            let (chat, sources) = prepare(&retriever, top_k, request).await?;

            tracing::info!(model = %chat.model, passages = sources.len(), "Streaming answer");
            let mut tokens = llm.chat_stream(&chat).await?;

            let mut count = 0usize;
            while let Some(token) = tokens.next().await {
                let token = token?;
                count += 1;
                yield StreamEvent::Token { content: token };
            }

            tracing::info!(tokens = count, "Answer stream finished");
            yield StreamEvent::Sources { content: sources };
        })
    }

    /// Answer one question without streaming.
    pub async fn ask(&self, request: AskRequest) -> AppResult<RagAnswer> {
        let (chat, sources) = prepare(&self.retriever, self.top_k, request).await?;

        tracing::info!(model = %chat.model, passages = sources.len(), "Requesting answer");
        let answer = self.llm.chat(&chat).await?;

        Ok(RagAnswer { answer, sources })
    }
}

/// Retrieval and composition shared by both answering paths.
async fn prepare(
    retriever: &Retriever,
    top_k: usize,
    request: AskRequest,
) -> AppResult<(ChatRequest, Vec<SourceRef>)> {
    let passages = retriever.retrieve(&request.question, top_k).await?;

    let messages = compose(
        &request.question,
        &passages,
        &request.history,
        request.instruction.as_deref(),
    )?;
    let sources = extract_sources(&passages);

    let chat = ChatRequest::new(messages, request.model).with_options(request.options);
    Ok((chat, sources))
}
