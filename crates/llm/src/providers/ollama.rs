//! Ollama chat provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{
    boxed_token_stream, ChatMessage, ChatModel, ChatOptions, ChatRequest, ModelInfo, TokenStream,
    DEFAULT_NUM_CTX,
};
use futures::StreamExt;
use heyrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ollama `/api/chat` request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "no_options")]
    options: &'a ChatOptions,
}

fn no_options(options: &&ChatOptions) -> bool {
    options.is_empty()
}

/// One `/api/chat` response object (a whole answer, or one line of a stream).
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    model_info: Option<Map<String, Value>>,
}

/// Ollama chat client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn to_ollama_request<'a>(&self, request: &'a ChatRequest, stream: bool) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream,
            options: &request.options,
        }
    }

    async fn post_chat(&self, request: &ChatRequest, stream: bool) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.to_ollama_request(request, stream))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send request to Ollama: {}", e)))?;

        ensure_success(response).await
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn ensure_success(response: reqwest::Response) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Upstream(format!(
        "Ollama API error ({}): {}",
        status, error_text
    )))
}

/// Split complete newline-terminated lines off the front of `buffer`.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        line.pop();
        lines.push(line);
    }
    lines
}

/// Parse one NDJSON line into its token, skipping blank lines and empty deltas.
fn parse_line(line: &[u8]) -> AppResult<Option<String>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let chunk: OllamaChatResponse = serde_json::from_slice(line)
        .map_err(|e| AppError::Upstream(format!("Failed to parse chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(AppError::Upstream(format!("Ollama stream error: {}", error)));
    }

    Ok(chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty()))
}

/// Read the context length out of `/api/show` model_info (`<arch>.context_length`).
fn context_length(model_info: &Map<String, Value>) -> Option<u64> {
    model_info
        .iter()
        .find(|(key, _)| key.contains("context_length"))
        .and_then(|(_, value)| value.as_u64())
}

#[async_trait::async_trait]
impl ChatModel for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: &ChatRequest) -> AppResult<String> {
        tracing::info!(model = %request.model, "Sending chat request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let response = self.post_chat(request, false).await?;
        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Ollama response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(AppError::Upstream(format!("Ollama error: {}", error)));
        }

        tracing::info!("Received chat answer from Ollama");
        Ok(body.message.map(|m| m.content).unwrap_or_default())
    }

    async fn chat_stream(&self, request: &ChatRequest) -> AppResult<TokenStream> {
        tracing::info!(model = %request.model, "Starting streaming chat request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let response = self.post_chat(request, true).await?;
        let mut bytes = response.bytes_stream();

        // Ollama sends newline-delimited JSON; network chunks may split a line.
        let stream = async_stream::try_stream! {
            let mut pending: Vec<u8> = Vec::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| AppError::Upstream(format!("Stream error: {}", e)))?;
                pending.extend_from_slice(&chunk);

                for line in drain_lines(&mut pending) {
                    if let Some(token) = parse_line(&line)? {
                        yield token;
                    }
                }
            }

            if let Some(token) = parse_line(&pending)? {
                yield token;
            }

            tracing::debug!("Ollama stream finished");
        };

        Ok(boxed_token_stream(stream))
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to list Ollama models: {}", e)))?;

        let tags: TagsResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse model list: {}", e)))?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| m.name)
            .filter(|name| !name.contains("embed"))
            .collect())
    }

    async fn model_info(&self, model: &str) -> AppResult<ModelInfo> {
        let url = format!("{}/api/show", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to describe model: {}", e)))?;

        let show: ShowResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse model info: {}", e)))?;

        Ok(ModelInfo {
            name: model.to_string(),
            num_ctx: show
                .model_info
                .as_ref()
                .and_then(context_length)
                .unwrap_or(DEFAULT_NUM_CTX),
        })
    }
}
