//! Chroma-backed vector store.
//!
//! Talks to a Chroma server over its HTTP API. The collection is created on
//! first use and its id cached for the lifetime of the client.

use crate::vector_store::{summarize_documents, DocumentInfo, VectorStore};
use heyrag_core::{AppError, AppResult, Passage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 3],
}

/// Query results are nested one list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Map<String, Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<Option<f32>>>,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    ids: Vec<String>,
    documents: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    metadatas: Vec<&'a Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct GetResponse {
    #[serde(default)]
    metadatas: Vec<Option<Map<String, Value>>>,
}

/// Chroma HTTP client bound to one collection.
pub struct ChromaStore {
    base_url: String,
    collection: String,
    collection_id: OnceCell<String>,
    client: reqwest::Client,
}

impl ChromaStore {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            collection_id: OnceCell::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Resolve (creating if needed) the collection id.
    async fn collection_id(&self) -> AppResult<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections", self.base_url);
                let body = serde_json::json!({ "name": self.collection, "get_or_create": true });
                let collection: CollectionResponse = self.post_json(&url, &body).await?;
                tracing::debug!(collection = %self.collection, id = %collection.id, "Resolved Chroma collection");
                Ok::<_, AppError>(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn collection_url(&self, action: &str) -> AppResult<String> {
        Ok(format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url,
            self.collection_id().await?,
            action
        ))
    }

    async fn post_json<T, B>(&self, url: &str, body: &B) -> AppResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach Chroma: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Upstream(format!(
                "Chroma API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Chroma response: {}", e)))
    }
}

/// Flatten the first query's results into passages.
fn into_passages(response: QueryResponse) -> Vec<Passage> {
    let documents = response.documents.into_iter().next().unwrap_or_default();
    let mut metadatas = response.metadatas.into_iter().next().unwrap_or_default().into_iter();
    let mut distances = response.distances.into_iter().next().unwrap_or_default().into_iter();

    documents
        .into_iter()
        .map(|text| Passage {
            text: text.unwrap_or_default(),
            embedding: Vec::new(),
            metadata: metadatas.next().flatten().unwrap_or_default(),
            score: distances.next().flatten().unwrap_or(f32::MAX),
        })
        .collect()
}

#[async_trait::async_trait]
impl VectorStore for ChromaStore {
    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<Passage>> {
        let url = self.collection_url("query").await?;
        let request = QueryRequest {
            query_embeddings: [embedding],
            n_results: top_k,
            include: ["documents", "metadatas", "distances"],
        };

        let response: QueryResponse = self.post_json(&url, &request).await?;
        let passages = into_passages(response);

        tracing::debug!("Chroma returned {} passages", passages.len());
        Ok(passages)
    }

    async fn add_documents(&self, passages: &[Passage]) -> AppResult<()> {
        if passages.is_empty() {
            return Ok(());
        }

        let url = self.collection_url("add").await?;
        let request = AddRequest {
            ids: passages.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect(),
            documents: passages.iter().map(|p| p.text.as_str()).collect(),
            embeddings: passages.iter().map(|p| p.embedding.as_slice()).collect(),
            metadatas: passages.iter().map(|p| &p.metadata).collect(),
        };

        let _: Value = self.post_json(&url, &request).await?;
        tracing::info!("Added {} passages to Chroma", passages.len());
        Ok(())
    }

    async fn delete_document(&self, document_id: &str) -> AppResult<()> {
        let url = self.collection_url("delete").await?;
        let body = serde_json::json!({ "where": { "document_id": document_id } });

        let _: Value = self.post_json(&url, &body).await?;
        tracing::info!(document_id, "Deleted document from Chroma");
        Ok(())
    }

    async fn list_documents(&self) -> AppResult<Vec<DocumentInfo>> {
        let url = self.collection_url("get").await?;
        let body = serde_json::json!({ "include": ["metadatas"] });

        let response: GetResponse = self.post_json(&url, &body).await?;
        let passages: Vec<Passage> = response
            .metadatas
            .into_iter()
            .flatten()
            .map(|metadata| Passage {
                metadata,
                ..Passage::new("", 0.0)
            })
            .collect();

        Ok(summarize_documents(&passages))
    }
}
