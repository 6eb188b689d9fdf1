//! Qdrant vector store backend.
//!
//! Only available when the `qdrant` feature is enabled. Implements
//! [`VectorStore`] over gRPC via the
//! [qdrant-client](https://docs.rs/qdrant-client) crate; passage provenance
//! is stored as point payload so search results come back citable.

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;

use tutor_core::{Passage, Result, ScoredPassage, TutorError};

use crate::vectorstore::VectorStore;

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance. Payload schema per point:
/// `text`, `chapter_id`, `section_title` (strings) and `position` (integer).
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a store connecting to the given URL (e.g. `http://localhost:6334`).
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a store connecting to a Qdrant Cloud cluster with an API key.
    pub fn with_api_key(url: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).api_key(api_key.into()).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> TutorError {
        TutorError::VectorStore { backend: "qdrant".to_string(), message: e.to_string() }
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn extract_u32(value: &QdrantValue) -> Option<u32> {
        match &value.kind {
            Some(Kind::IntegerValue(n)) => u32::try_from(*n).ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        if collections.collections.iter().any(|c| c.name == name) {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, passages: &[Passage]) -> Result<()> {
        if passages.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = passages
            .iter()
            .map(|passage| {
                let mut payload_map = serde_json::Map::new();
                payload_map
                    .insert("text".to_string(), serde_json::Value::String(passage.text.clone()));
                payload_map.insert(
                    "chapter_id".to_string(),
                    serde_json::Value::String(passage.chapter_id.clone()),
                );
                payload_map.insert(
                    "section_title".to_string(),
                    serde_json::Value::String(passage.section_title.clone()),
                );
                payload_map
                    .insert("position".to_string(), serde_json::Value::from(passage.position));

                let payload =
                    Payload::try_from(serde_json::Value::Object(payload_map)).unwrap_or_default();

                PointStruct::new(passage.id.clone(), passage.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = passages.len(), "upserted passages to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();

                let text =
                    scored.payload.get("text").and_then(Self::extract_string).unwrap_or_default();
                let chapter_id = scored
                    .payload
                    .get("chapter_id")
                    .and_then(Self::extract_string)
                    .unwrap_or_default();
                let section_title = scored
                    .payload
                    .get("section_title")
                    .and_then(Self::extract_string)
                    .unwrap_or_default();
                let position =
                    scored.payload.get("position").and_then(Self::extract_u32).unwrap_or_default();

                ScoredPassage {
                    passage: Passage {
                        id,
                        text,
                        embedding: vec![],
                        chapter_id,
                        section_title,
                        position,
                    },
                    score: scored.score,
                }
            })
            .collect();

        Ok(results)
    }
}
