//! Server configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, bail};

/// Everything the server reads from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8000`.
    pub bind_addr: String,
    /// Anthropic API key for the generation backend.
    pub anthropic_api_key: String,
    /// Claude model override.
    pub claude_model: Option<String>,
    /// OpenAI API key for query embeddings.
    pub openai_api_key: String,
    /// Qdrant cluster URL; in-memory store when unset.
    pub qdrant_url: Option<String>,
    /// Qdrant API key (Qdrant Cloud).
    pub qdrant_api_key: Option<String>,
    /// Vector store collection holding the textbook passages.
    pub collection: String,
    /// Postgres URL for the cache and interaction log; in-memory when unset.
    pub database_url: Option<String>,
    /// Soft daily token budget.
    pub daily_token_budget: u64,
    /// Serve questions from an empty context when the vector store is down,
    /// instead of returning a "search unavailable" error.
    pub degrade_on_retrieval_failure: bool,
    /// Generation call timeout.
    pub generation_timeout: Duration,
}

impl ServerConfig {
    /// Read the configuration, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        // Missing .env is fine; a malformed one is not.
        match dotenvy::dotenv() {
            Ok(_) | Err(dotenvy::Error::Io(_)) => {}
            Err(e) => bail!("failed to load .env: {e}"),
        }

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:8000"),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY must be set")?,
            claude_model: std::env::var("CLAUDE_MODEL").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set (query embeddings)")?,
            qdrant_url: std::env::var("QDRANT_URL").ok(),
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok(),
            collection: env_or("QDRANT_COLLECTION_NAME", "textbook_passages"),
            database_url: std::env::var("DATABASE_URL").ok(),
            daily_token_budget: env_parse_or("DAILY_TOKEN_BUDGET", 1_000_000),
            degrade_on_retrieval_failure: env_parse_or("DEGRADE_ON_RETRIEVAL_FAILURE", false),
            generation_timeout: Duration::from_millis(env_parse_or(
                "GENERATION_TIMEOUT_MS",
                2500,
            )),
        })
    }

    /// Log a redacted summary at startup.
    pub fn log_summary(&self) {
        tracing::info!(
            bind_addr = %self.bind_addr,
            collection = %self.collection,
            qdrant = self.qdrant_url.is_some(),
            postgres = self.database_url.is_some(),
            daily_token_budget = self.daily_token_budget,
            "server configured"
        );
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
