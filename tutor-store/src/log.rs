//! Append-only interaction log.

use async_trait::async_trait;
use tokio::sync::RwLock;

use tutor_core::{InteractionRecord, Result};

/// Durable record of question/answer exchanges.
///
/// Writes are best-effort from the request's perspective: the pipeline
/// has already computed the answer when it records the exchange, so a
/// failed write is reported to monitoring and the answer is returned
/// anyway. Records are never mutated or deleted here.
#[async_trait]
pub trait InteractionLog: Send + Sync {
    /// Append one interaction record.
    async fn record(&self, record: &InteractionRecord) -> Result<()>;

    /// The most recent records for a user, newest first. `limit` is capped
    /// at 100 by callers.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<InteractionRecord>>;
}

/// An in-memory [`InteractionLog`].
#[derive(Default)]
pub struct InMemoryInteractionLog {
    records: RwLock<Vec<InteractionRecord>>,
}

impl InMemoryInteractionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records, across all users.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the log holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl InteractionLog for InMemoryInteractionLog {
    async fn record(&self, record: &InteractionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<InteractionRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<InteractionRecord> = records
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }
}
