//! Offline embedder with one axis per keyword.
//!
//! A text embeds to its keyword counts scaled to unit length, so the squared
//! L2 distance between two texts is `2 - 2 * cos`. Texts with the same keyword
//! mix sit at 0.0 and texts sharing no keyword sit at 2.0, above the retrieval
//! cut-off. A text without any keyword embeds to the zero vector.

use crate::embeddings::provider::EmbeddingProvider;
use heyrag_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    model: String,
}

impl KeywordEmbedder {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }
        let model = unique.join(",");
        Self {
            keywords: unique,
            model,
        }
    }

    /// Build from a comma-separated keyword list such as `"paris,france"`.
    pub fn from_model(model: &str) -> AppResult<Self> {
        let embedder = Self::new(model.split(','));
        if embedder.keywords.is_empty() {
            return Err(AppError::Config(
                "mock embedder needs a comma-separated keyword list as its model".to_string(),
            ));
        }
        Ok(embedder)
    }

    pub fn dimensions(&self) -> usize {
        self.keywords.len()
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.keywords.len()];
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            let word = word.to_lowercase();
            if let Some(axis) = self.keywords.iter().position(|k| *k == word) {
                vector[axis] += 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    fn geo() -> KeywordEmbedder {
        KeywordEmbedder::new(["paris", "france", "capital", "pasta"])
    }

    #[test]
    fn test_axes_follow_keywords() {
        let embedder = geo();
        assert_eq!(embedder.dimensions(), 4);
        assert_eq!(embedder.vector("Pasta!"), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_matching_ignores_case_and_punctuation() {
        let embedder = geo();
        assert_eq!(
            embedder.vector("PARIS, France."),
            embedder.vector("france paris")
        );
    }

    #[test]
    fn test_partial_words_do_not_match() {
        let embedder = geo();
        assert!(embedder.vector("parisian capitals").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_distances() {
        let embedder = geo();
        let question = embedder.vector("What is the capital of France?");

        let same = embedder.vector("France has a capital.");
        assert!(squared_l2(&question, &same) < 1e-6);

        let disjoint = embedder.vector("Fresh pasta");
        assert!((squared_l2(&question, &disjoint) - 2.0).abs() < 1e-6);

        let partial = embedder.vector("Paris is the capital of France.");
        let distance = squared_l2(&question, &partial);
        assert!(distance > 0.0 && distance < 1.0);
    }

    #[test]
    fn test_unit_length() {
        let vector = geo().vector("paris paris france");
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_model() {
        let embedder = KeywordEmbedder::from_model(" Paris, france ,,paris").unwrap();
        assert_eq!(embedder.dimensions(), 2);
        assert_eq!(embedder.model_name(), "paris,france");

        assert!(matches!(
            KeywordEmbedder::from_model(" , "),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_batch_keeps_order() {
        let embedder = geo();
        let texts = vec!["pasta".to_string(), "paris".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings[0], vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(embeddings[1], vec![1.0, 0.0, 0.0, 0.0]);
    }
}
