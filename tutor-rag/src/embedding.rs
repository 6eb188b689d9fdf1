//! Embedding provider trait.

use async_trait::async_trait;

use tutor_core::Result;

/// A provider that turns text into fixed-dimension embedding vectors.
///
/// Queries must be embedded with the **same model** that embedded the
/// indexed passages — a mismatch silently degrades retrieval with no error
/// signal. Implementations therefore expose the model identity via
/// [`model_id`](EmbeddingProvider::model_id) so the retriever can log it
/// and operators can verify it against the index.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation embeds sequentially; backends with
    /// native batching should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// The pinned model identifier (e.g. `text-embedding-3-small@v1`).
    fn model_id(&self) -> &str;
}
