use paperseek_common::{PaperSeekError, Result};
use std::sync::Arc;
use tracing::debug;

use crate::llm_trait::LlmClient;

/// Turns text into L2-normalized embedding vectors of a fixed dimension
pub struct TextEmbedder {
    client: Arc<dyn LlmClient>,
    model: String,
    dimension: usize,
}

impl TextEmbedder {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed `text`; blank text yields `Ok(None)` without calling the model
    pub async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Skipping embedding of empty text");
            return Ok(None);
        }

        let mut vector = self.client.embed(&self.model, text).await?;
        if vector.len() != self.dimension {
            return Err(PaperSeekError::dimension_mismatch(self.dimension, vector.len()));
        }
        if !l2_normalize(&mut vector) {
            return Err(PaperSeekError::llm(format!(
                "Model '{}' returned a zero or non-finite embedding",
                self.model
            )));
        }
        Ok(Some(vector))
    }
}

/// Scale `vector` to unit length; false when its norm is zero or not finite
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    vector.iter_mut().for_each(|x| *x /= norm);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerateRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedding {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FixedEmbedding {
        async fn generate(&self, _request: GenerateRequest) -> Result<String> {
            Err(PaperSeekError::llm("not used"))
        }

        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }

        async fn test_connection(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn embedder(vector: Vec<f32>, dimension: usize) -> (TextEmbedder, Arc<FixedEmbedding>) {
        let client = Arc::new(FixedEmbedding {
            vector,
            calls: AtomicUsize::new(0),
        });
        (TextEmbedder::new(client.clone(), "test-embed", dimension), client)
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        assert!(l2_normalize(&mut v));
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        assert!(!l2_normalize(&mut zero));
    }

    #[tokio::test]
    async fn test_embed_normalizes() {
        let (embedder, _) = embedder(vec![0.0, 2.0, 0.0], 3);
        let v = embedder.embed("graph neural networks").await.unwrap().unwrap();
        assert_eq!(v, vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_embed_blank_text_is_none() {
        let (embedder, client) = embedder(vec![1.0, 0.0, 0.0], 3);
        assert!(embedder.embed("   \n").await.unwrap().is_none());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_wrong_dimension() {
        let (embedder, _) = embedder(vec![1.0, 0.0], 3);
        assert!(matches!(
            embedder.embed("text").await,
            Err(PaperSeekError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[tokio::test]
    async fn test_embed_zero_vector() {
        let (embedder, _) = embedder(vec![0.0, 0.0, 0.0], 3);
        assert!(matches!(embedder.embed("text").await, Err(PaperSeekError::Llm(_))));
    }
}
