//! Query-time retrieval: embed, search, filter.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use tutor_core::{Result, RetrievalResult, TutorError};

use crate::config::RetrieverConfig;
use crate::embedding::EmbeddingProvider;
use crate::vectorstore::VectorStore;

/// Embeds a query and returns the passages above the similarity threshold.
///
/// The embed-and-search round trip runs under an explicit timeout so a slow
/// vector store cannot hold a request open; an unreachable or timed-out
/// store fails with [`TutorError::RetrievalUnavailable`], which callers map
/// to a degraded user-facing message. An *empty* result is not a failure —
/// it is the normal outcome for questions the textbook does not cover.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_rag::{Retriever, RetrieverConfig};
///
/// let retriever = Retriever::new(config, embeddings, store)?;
/// let passages = retriever.retrieve("How does backpropagation work?").await?;
/// ```
pub struct Retriever {
    config: RetrieverConfig,
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Create a retriever over the given embedding provider and store.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::Config`] if the configuration is out of range.
    pub fn new(
        config: RetrieverConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            collection = %config.collection,
            embedding_model = embeddings.model_id(),
            dimensions = embeddings.dimensions(),
            "retriever initialized"
        );
        Ok(Self { config, embeddings, store })
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve passages for `query` using the configured `top_k` and threshold.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_with(query, self.config.top_k, self.config.threshold).await
    }

    /// Retrieve passages with explicit `top_k` and `threshold` overrides.
    ///
    /// # Errors
    ///
    /// - [`TutorError::InvalidQuery`] if the query is empty after trimming
    ///   or the overrides are out of range.
    /// - [`TutorError::RetrievalUnavailable`] if embedding or search fails
    ///   or exceeds the configured timeout.
    pub async fn retrieve_with(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<RetrievalResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TutorError::InvalidQuery("question must not be empty".to_string()));
        }
        if !(1..=10).contains(&top_k) {
            return Err(TutorError::InvalidQuery(format!(
                "top_k ({top_k}) must be between 1 and 10"
            )));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TutorError::InvalidQuery(format!(
                "threshold ({threshold}) must be between 0 and 1"
            )));
        }

        let search = self.embed_and_search(query, top_k);
        let results = match timeout(self.config.search_timeout, search).await {
            Ok(results) => results?,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.search_timeout.as_millis() as u64,
                    "vector search timed out"
                );
                return Err(TutorError::RetrievalUnavailable {
                    message: format!(
                        "vector search exceeded {}ms",
                        self.config.search_timeout.as_millis()
                    ),
                });
            }
        };

        let kept: RetrievalResult = results.into_iter().filter(|r| r.score >= threshold).collect();
        debug!(query_len = query.len(), result_count = kept.len(), threshold, "retrieval completed");
        Ok(kept)
    }

    async fn embed_and_search(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        let embedding = self.embeddings.embed(query).await.map_err(|e| {
            warn!(error = %e, "query embedding failed");
            TutorError::RetrievalUnavailable { message: format!("query embedding failed: {e}") }
        })?;

        self.store.search(&self.config.collection, &embedding, top_k).await.map_err(|e| {
            warn!(collection = %self.config.collection, error = %e, "vector store search failed");
            TutorError::RetrievalUnavailable { message: format!("vector search failed: {e}") }
        })
    }
}
