//! Vector store trait for passage storage and similarity search.

use async_trait::async_trait;

use tutor_core::{Passage, Result, ScoredPassage};

/// A storage backend holding passage embeddings with similarity search.
///
/// The production index is populated by an external ingestion job; the
/// pipeline itself consumes it read-only via [`search`](VectorStore::search).
/// Upserts exist so tests and ingestion tooling can share the same trait.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("textbook", 1536).await?;
/// store.upsert("textbook", &passages).await?;
/// let hits = store.search("textbook", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Upsert passages into a collection. Passages must have embeddings set.
    async fn upsert(&self, collection: &str, passages: &[Passage]) -> Result<()>;

    /// Search for the `top_k` passages most similar to the given embedding.
    ///
    /// Returns results ordered by descending cosine similarity.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>>;
}
