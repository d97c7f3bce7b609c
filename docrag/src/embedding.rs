//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A service that turns text into fixed-dimension vectors.
///
/// [`embed_batch`](EmbeddingProvider::embed_batch) must return one vector per
/// input, in input order. The indexer sends one batch per request and treats
/// any error as a failure of the whole batch. The default implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends with a
/// native batch endpoint should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let vectors = provider.embed_batch(&["first", "second"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Check that a batch response lines up with its request.
pub(crate) fn check_batch_len(provider: &str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        return Ok(());
    }
    Err(RagError::EmbeddingError {
        provider: provider.to_string(),
        message: format!("requested {expected} embeddings, received {got}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn default_batch_preserves_order() {
        let vectors = LengthEmbedder.embed_batch(&["a", "abc", "ab"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);
    }

    #[test]
    fn batch_length_mismatch_is_an_embedding_error() {
        assert!(check_batch_len("mock", 3, 3).is_ok());
        let err = check_batch_len("mock", 3, 2).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
    }
}
