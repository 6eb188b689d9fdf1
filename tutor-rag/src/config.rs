//! Configuration for retrieval and context assembly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tutor_core::{Result, TutorError};

/// Configuration for the [`Retriever`](crate::Retriever).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrieverConfig {
    /// The vector store collection holding the textbook passages.
    pub collection: String,
    /// Number of top results to request from vector search. Range `[1, 10]`.
    pub top_k: usize,
    /// Minimum cosine similarity for results. Range `[0, 1]`.
    pub threshold: f32,
    /// Timeout covering the embed-and-search round trip.
    #[serde(with = "duration_millis")]
    pub search_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            collection: "textbook_passages".to_string(),
            top_k: 5,
            threshold: 0.7,
            search_timeout: Duration::from_secs(2),
        }
    }
}

impl RetrieverConfig {
    /// Validate the parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::Config`] if `top_k` is outside `[1, 10]`, the
    /// threshold is outside `[0, 1]`, or the collection name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(TutorError::Config("collection name must not be empty".to_string()));
        }
        if !(1..=10).contains(&self.top_k) {
            return Err(TutorError::Config(format!(
                "top_k ({}) must be between 1 and 10",
                self.top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(TutorError::Config(format!(
                "threshold ({}) must be between 0 and 1",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for the [`ContextAssembler`](crate::ContextAssembler).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssemblerConfig {
    /// Token budget for retrieved passages.
    pub context_budget_tokens: usize,
    /// Independent token budget for user-selected text.
    pub selected_text_budget_tokens: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self { context_budget_tokens: 2000, selected_text_budget_tokens: 2000 }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
