//! Retrieval: embed the question, search, drop distant passages.

use crate::embeddings::EmbeddingProvider;
use crate::vector_store::VectorStore;
use heyrag_core::{AppResult, Passage};
use std::sync::Arc;

/// Passages at this distance or beyond are discarded.
pub const MAX_DISTANCE: f32 = 1.5;

/// Default number of nearest passages requested from the store.
pub const DEFAULT_TOP_K: usize = 5;

/// Embedder plus vector store.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Passages relevant to `question`, nearest first.
    ///
    /// An empty result means nothing was close enough; it is not an error.
    /// Embedding and search failures propagate untouched.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> AppResult<Vec<Passage>> {
        let embedding = self.embedder.embed(question).await?;
        let candidates = self.store.query(&embedding, top_k).await?;
        let found = candidates.len();

        let passages = filter_relevant(candidates);

        tracing::debug!(
            found,
            kept = passages.len(),
            threshold = MAX_DISTANCE,
            "Retrieved passages"
        );

        Ok(passages)
    }
}

/// Keep passages strictly closer than [`MAX_DISTANCE`], preserving order.
pub fn filter_relevant(passages: Vec<Passage>) -> Vec<Passage> {
    passages
        .into_iter()
        .filter(|passage| passage.score < MAX_DISTANCE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let passages = vec![
            Passage::new("close", 0.2),
            Passage::new("edge", 1.5),
            Passage::new("far", 2.3),
            Passage::new("almost", 1.49),
        ];

        let kept: Vec<_> = filter_relevant(passages)
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(kept, vec!["close", "almost"]);
    }

    #[test]
    fn test_all_distant_yields_empty() {
        let passages = vec![Passage::new("a", 1.5), Passage::new("b", 9.0)];
        assert!(filter_relevant(passages).is_empty());
    }
}
