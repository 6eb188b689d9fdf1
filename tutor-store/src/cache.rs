//! Response and content caches.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tutor_core::{Answer, Result};

/// Content-addressed cache of computed answers, keyed by fingerprint.
///
/// `put` is idempotent in effect: generation is content-addressed, so two
/// writers racing on one fingerprint write the same value and last-writer-
/// wins is harmless (wasted compute, no correctness impact). Entries have
/// no TTL — answers are stable relative to the static textbook, and a
/// re-index clears the cache out of band.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a cached answer.
    async fn get(&self, fingerprint: &str) -> Result<Option<Answer>>;

    /// Insert or overwrite the answer for a fingerprint.
    async fn put(&self, fingerprint: &str, answer: &Answer) -> Result<()>;
}

/// Simple keyed cache for generated chapter content (personalization and
/// translation share this — same pattern as the response cache, simpler keys).
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Look up cached content by key.
    async fn get_content(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite content for a key.
    async fn put_content(&self, key: &str, content: &str) -> Result<()>;
}

/// Cache key for a personalized chapter.
pub fn personalization_key(chapter_id: &str, level: &str) -> String {
    format!("personalize:{chapter_id}:{level}")
}

/// Cache key for a translated chapter.
pub fn translation_key(chapter_id: &str, language: &str) -> String {
    format!("translate:{chapter_id}:{language}")
}

struct CacheEntry {
    answer: Answer,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// An in-memory [`ResponseCache`] and [`ContentCache`].
#[derive(Default)]
pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached answers.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, fingerprint: &str) -> Result<Option<Answer>> {
        let entries = self.entries.read().await;
        Ok(entries.get(fingerprint).map(|e| e.answer.clone()))
    }

    async fn put(&self, fingerprint: &str, answer: &Answer) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            fingerprint.to_string(),
            CacheEntry { answer: answer.clone(), created_at: Utc::now() },
        );
        Ok(())
    }
}

/// An in-memory [`ContentCache`].
#[derive(Default)]
pub struct InMemoryContentCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryContentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentCache for InMemoryContentCache {
    async fn get_content(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put_content(&self, key: &str, content: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), content.to_string());
        Ok(())
    }
}
