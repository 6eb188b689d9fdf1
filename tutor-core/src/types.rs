//! Data types for passages, retrieval results, answers, and interaction records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fixed-size span of textbook content with its vector embedding and
/// the provenance metadata required for citation.
///
/// Passages are immutable once indexed. A passage with no `chapter_id`
/// cannot be cited and is excluded from answer construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// Unique identifier for the passage.
    pub id: String,
    /// The text content of the passage.
    pub text: String,
    /// The vector embedding for this passage's text.
    pub embedding: Vec<f32>,
    /// The chapter this passage was extracted from.
    pub chapter_id: String,
    /// The section heading within the chapter.
    pub section_title: String,
    /// Position of the passage within its chapter.
    pub position: u32,
}

impl Passage {
    /// Whether this passage carries the provenance metadata needed to cite it.
    pub fn is_citable(&self) -> bool {
        !self.chapter_id.trim().is_empty()
    }
}

/// A retrieved [`Passage`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPassage {
    /// The retrieved passage.
    pub passage: Passage,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// The ordered result of one vector search, descending by score.
///
/// All scores are at or above the configured threshold and the length is
/// at most the requested `top_k`. An empty result is a normal outcome
/// (nothing in the book matched), not a failure.
pub type RetrievalResult = Vec<ScoredPassage>;

/// A source citation pointing back into the textbook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Citation {
    /// The cited chapter.
    pub chapter_id: String,
    /// The cited section within the chapter.
    pub section_title: String,
}

/// Whether an answer is grounded in the supplied context or a refusal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Grounding {
    /// The answer is drawn from context, with at least one valid citation.
    Answered,
    /// The context did not support an answer; the text is the configured
    /// fallback message.
    Refused,
}

/// Token counts reported by a generation backend for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u64,
    /// Tokens produced in the response.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Total tokens for cost accounting.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A generated answer, its citations, and its grounding classification.
///
/// Every citation is guaranteed to reference a passage that was present in
/// the context supplied to generation — citations the model fabricated are
/// stripped before the answer leaves the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The generated answer text (or the fallback refusal message).
    pub text: String,
    /// Citations traceable to the assembled context. Empty for refusals.
    pub citations: Vec<Citation>,
    /// Grounding classification.
    pub grounding: Grounding,
    /// Token usage for the generation call. Zero when the backend was
    /// never invoked (refusal short-circuit, cache hit).
    pub usage: TokenUsage,
}

impl Answer {
    /// Construct a refusal answer carrying the given fallback text.
    pub fn refusal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
            grounding: Grounding::Refused,
            usage: TokenUsage::default(),
        }
    }
}

/// One question/answer exchange, as appended to the interaction log.
///
/// Records are never mutated or deleted by the pipeline; retention and
/// export are an external data-governance concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    /// The asking user, or `None` for anonymous callers.
    pub user_id: Option<String>,
    /// The question as asked.
    pub question: String,
    /// The answer text returned to the caller.
    pub answer_text: String,
    /// The citations returned with the answer.
    pub citations: Vec<Citation>,
    /// When the exchange completed.
    pub timestamp: DateTime<Utc>,
}
