//! Generation backend trait for invoking a generative model.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::TokenUsage;

/// A single generation request: system instruction, user prompt, and an
/// output-token ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The system instruction (grounding rules, persona).
    pub system: String,
    /// The user-turn prompt (context blocks plus the question).
    pub user: String,
    /// Maximum tokens the backend may produce.
    pub max_tokens: u32,
}

/// Raw output of one generation call: the text plus reported token usage.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    /// The generated text, as returned by the backend.
    pub text: String,
    /// Token usage reported by the backend, used for cost tracking.
    pub usage: TokenUsage,
}

/// A client for a generative model.
///
/// Implementations wrap a specific vendor API (the Anthropic Messages API
/// client lives in `tutor-model`) behind a unified async interface. Each
/// call must be bounded by a per-call timeout; a timed-out or failed call
/// returns [`TutorError::Generation`](crate::TutorError::Generation) so the
/// retry helper can distinguish it from permanent failures.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_core::{GenerationBackend, GenerationRequest};
///
/// let response = backend
///     .generate(GenerationRequest {
///         system: "Answer only from the context.".into(),
///         user: "Context: ...\n\nQuestion: ...".into(),
///         max_tokens: 1000,
///     })
///     .await?;
/// println!("{} ({} tokens)", response.text, response.usage.total());
/// ```
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// The backend's model name, for logging and diagnostics.
    fn name(&self) -> &str;

    /// Generate a completion for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;
}
