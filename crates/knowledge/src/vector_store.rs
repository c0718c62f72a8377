//! Vector store abstraction for passages.
//!
//! Defines a trait for provider-agnostic vector storage and nearest-neighbour
//! search, plus a brute-force in-memory implementation.

use heyrag_core::{AppError, AppResult, Passage};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One stored document, as reported by [`VectorStore::list_documents`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub filename: String,
    pub chunks: usize,
}

/// Trait for vector store backends.
///
/// Only `query` is used on the answering path; the remaining operations serve
/// ingestion and housekeeping.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the `top_k` passages nearest to `embedding`, ordered by ascending
    /// distance. Returned passages carry an empty embedding and the distance
    /// as `score`.
    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<Passage>>;

    /// Store passages. Each passage needs an embedding and a `document_id`.
    async fn add_documents(&self, passages: &[Passage]) -> AppResult<()>;

    /// Remove every passage of a document.
    async fn delete_document(&self, document_id: &str) -> AppResult<()>;

    /// Summarize stored documents.
    async fn list_documents(&self) -> AppResult<Vec<DocumentInfo>>;
}

/// Group passage metadata into per-document summaries, first-seen order.
pub fn summarize_documents<'a>(passages: impl IntoIterator<Item = &'a Passage>) -> Vec<DocumentInfo> {
    let mut documents: Vec<DocumentInfo> = Vec::new();

    for passage in passages {
        let Some(document_id) = passage.document_id() else {
            continue;
        };

        match documents.iter_mut().find(|d| d.document_id == document_id) {
            Some(doc) => doc.chunks += 1,
            None => documents.push(DocumentInfo {
                document_id: document_id.to_string(),
                filename: passage.filename().to_string(),
                chunks: 1,
            }),
        }
    }

    documents
}

/// Squared Euclidean distance, the metric Chroma uses by default.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Brute-force store kept in memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    passages: RwLock<Vec<Passage>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<Passage>> {
        let passages = self.passages.read().await;

        let mut scored: Vec<Passage> = passages
            .iter()
            .filter(|p| p.embedding.len() == embedding.len())
            .map(|p| Passage {
                text: p.text.clone(),
                embedding: Vec::new(),
                metadata: p.metadata.clone(),
                score: squared_l2(embedding, &p.embedding),
            })
            .collect();

        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(top_k);

        tracing::debug!("In-memory query returned {} passages", scored.len());
        Ok(scored)
    }

    async fn add_documents(&self, passages: &[Passage]) -> AppResult<()> {
        if let Some(bad) = passages
            .iter()
            .find(|p| p.embedding.is_empty() || p.document_id().is_none())
        {
            return Err(AppError::Other(format!(
                "Passage from '{}' lacks an embedding or document_id",
                bad.filename()
            )));
        }

        self.passages.write().await.extend_from_slice(passages);
        Ok(())
    }

    async fn delete_document(&self, document_id: &str) -> AppResult<()> {
        self.passages
            .write()
            .await
            .retain(|p| p.document_id() != Some(document_id));
        Ok(())
    }

    async fn list_documents(&self) -> AppResult<Vec<DocumentInfo>> {
        Ok(summarize_documents(self.passages.read().await.iter()))
    }
}
