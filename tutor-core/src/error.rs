//! Error types shared across the `tutor-*` crates.

use thiserror::Error;

/// Errors that can occur anywhere in the Tutor pipeline.
///
/// Only a few of these are ever user-visible: retrieval and generation
/// outages map to degraded, non-technical messages at the HTTP boundary;
/// cache and log failures are absorbed and reported to monitoring.
/// Rate-limit denial is deliberately *not* an error — admission results
/// are values, see `tutor-governor`.
#[derive(Debug, Error)]
pub enum TutorError {
    /// The caller supplied an unusable query (empty after trimming,
    /// out-of-range `top_k` or threshold, unsupported language, …).
    #[error("invalid request: {0}")]
    InvalidQuery(String),

    /// A configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An error occurred during embedding generation.
    #[error("embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store is unreachable or timed out.
    ///
    /// Surfaced to callers as a "search temporarily unavailable" message,
    /// or degraded to an empty retrieval when policy allows.
    #[error("retrieval unavailable: {message}")]
    RetrievalUnavailable {
        /// A description of the failure.
        message: String,
    },

    /// A vector store operation failed for a non-availability reason.
    #[error("vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A single generation attempt failed. Transient — the retry helper
    /// will try again until the policy is exhausted.
    #[error("generation error ({provider}): {message}")]
    Generation {
        /// The generation backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation backend rejected the request outright (bad request,
    /// invalid credentials). Permanent — retrying cannot help.
    #[error("generation rejected ({provider}): {message}")]
    GenerationRejected {
        /// The generation backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation backend exhausted all retries.
    ///
    /// Surfaced to callers as an "AI service is busy, retry shortly"
    /// message. Never replaced by a fabricated answer.
    #[error("generation unavailable: {message}")]
    GenerationUnavailable {
        /// A description of the failure.
        message: String,
    },

    /// The generation backend returned a payload that does not conform to
    /// the expected shape. Not retryable — a malformed response is a bug
    /// or contract change, not a transient outage.
    #[error("response parse error: {message}")]
    ResponseParse {
        /// A description of the failure.
        message: String,
    },

    /// A cache read or write failed. Non-fatal: the pipeline proceeds
    /// without the cache.
    #[error("cache error ({backend}): {message}")]
    Cache {
        /// The cache backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An interaction-log write failed. Non-fatal: the answer has already
    /// been computed and is returned regardless.
    #[error("interaction log error ({backend}): {message}")]
    Log {
        /// The log backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },
}

impl TutorError {
    /// Whether a retry may succeed.
    ///
    /// Only single-attempt generation failures and retrieval outages are
    /// transient; validation, parsing, and configuration errors return
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TutorError::Generation { .. } | TutorError::RetrievalUnavailable { .. })
    }
}

/// A convenience result type for Tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;
