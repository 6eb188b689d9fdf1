//! In-memory vector store using cosine similarity.
//!
//! Backed by a `HashMap` behind a `tokio::sync::RwLock`. Used by tests and
//! small single-process deployments; production points the same trait at
//! Qdrant.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tutor_core::{Passage, Result, ScoredPassage, TutorError};

use crate::vectorstore::VectorStore;

/// An in-memory [`VectorStore`] using cosine similarity for search.
///
/// Collections are nested maps: collection name → passage ID → passage.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, Passage>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, collection: &str, passages: &[Passage]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| TutorError::VectorStore {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;
        for passage in passages {
            store.insert(passage.id.clone(), passage.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| TutorError::VectorStore {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        let mut scored: Vec<ScoredPassage> = store
            .values()
            .map(|passage| {
                let score = cosine_similarity(&passage.embedding, embedding);
                ScoredPassage { passage: passage.clone(), score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}
