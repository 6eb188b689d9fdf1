//! Application state and dependency wiring.

use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use tutor_core::TokenCounter;
use tutor_engine::{EngineConfig, TutorEngine};
use tutor_governor::{Governor, GovernorConfig, InMemoryCounterStore};
use tutor_model::{AnthropicBackend, AnthropicConfig};
use tutor_rag::{OpenAiEmbeddings, Retriever, RetrieverConfig, VectorStore};
use tutor_store::{ContentCache, InteractionLog, ResponseCache};

use crate::config::ServerConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The answer engine.
    pub engine: Arc<TutorEngine>,
}

impl AppState {
    /// Wrap an already-built engine (used by tests).
    pub fn new(engine: Arc<TutorEngine>) -> Self {
        Self { engine }
    }

    /// Build the full dependency graph from configuration.
    ///
    /// Backend selection is driven by what is configured: Qdrant and
    /// Postgres when their URLs are present (and the features compiled),
    /// in-memory stand-ins otherwise so a bare `cargo run` works out of
    /// the box.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let counter = TokenCounter::new().context("token counter")?;

        let embeddings =
            Arc::new(OpenAiEmbeddings::new(config.openai_api_key.clone()).context("embeddings")?);

        let store = build_vector_store(config).await?;
        let retriever_config =
            RetrieverConfig { collection: config.collection.clone(), ..Default::default() };
        let retriever =
            Arc::new(Retriever::new(retriever_config, embeddings, store).context("retriever")?);

        let mut anthropic = AnthropicConfig::new(config.anthropic_api_key.clone())
            .with_timeout(config.generation_timeout);
        if let Some(model) = &config.claude_model {
            anthropic = anthropic.with_model(model.clone());
        }
        let backend = Arc::new(AnthropicBackend::new(anthropic).context("generation backend")?);

        let governor_config = GovernorConfig {
            daily_token_budget: config.daily_token_budget,
            ..Default::default()
        };
        let governor =
            Arc::new(Governor::new(governor_config, Arc::new(InMemoryCounterStore::new())));

        let (response_cache, content_cache, interaction_log) = build_stores(config).await?;

        let engine = TutorEngine::builder()
            .retriever(retriever)
            .backend(backend)
            .governor(governor)
            .response_cache(response_cache)
            .content_cache(content_cache)
            .interaction_log(interaction_log)
            .token_counter(counter)
            .engine_config(EngineConfig {
                degrade_on_retrieval_failure: config.degrade_on_retrieval_failure,
                ..Default::default()
            })
            .build()
            .context("engine")?;

        Ok(Self { engine: Arc::new(engine) })
    }
}

async fn build_vector_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn VectorStore>> {
    match &config.qdrant_url {
        #[cfg(feature = "qdrant")]
        Some(url) => {
            let store = match &config.qdrant_api_key {
                Some(key) => tutor_rag::QdrantVectorStore::with_api_key(url, key.clone()),
                None => tutor_rag::QdrantVectorStore::new(url),
            }
            .context("qdrant")?;
            tracing::info!(url = %url, "using qdrant vector store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "qdrant"))]
        Some(_) => {
            anyhow::bail!("QDRANT_URL is set but the server was built without the 'qdrant' feature")
        }
        None => {
            warn!("QDRANT_URL not set, using an empty in-memory vector store");
            let store = tutor_rag::InMemoryVectorStore::new();
            store.create_collection(&config.collection, 1536).await.ok();
            Ok(Arc::new(store))
        }
    }
}

async fn build_stores(
    config: &ServerConfig,
) -> anyhow::Result<(Arc<dyn ResponseCache>, Arc<dyn ContentCache>, Arc<dyn InteractionLog>)> {
    match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = Arc::new(tutor_store::PostgresStore::new(url).await.map_err(|e| {
                anyhow::anyhow!("failed to connect to postgres: {e}")
            })?);
            store.init_schema().await.map_err(|e| anyhow::anyhow!("schema init failed: {e}"))?;
            tracing::info!("using postgres for cache and interaction log");
            Ok((store.clone(), store.clone(), store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            anyhow::bail!(
                "DATABASE_URL is set but the server was built without the 'postgres' feature"
            )
        }
        None => {
            warn!("DATABASE_URL not set, cache and interaction log are in-memory");
            Ok((
                Arc::new(tutor_store::InMemoryResponseCache::new()),
                Arc::new(tutor_store::InMemoryContentCache::new()),
                Arc::new(tutor_store::InMemoryInteractionLog::new()),
            ))
        }
    }
}
