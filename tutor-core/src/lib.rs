//! Core types and contracts for the Tutor RAG engine.
//!
//! This crate holds everything the other `tutor-*` crates share:
//!
//! - [`TutorError`] — the workspace error taxonomy
//! - the data model ([`Passage`], [`Answer`], [`Citation`], …)
//! - [`GenerationBackend`] — the contract any generative-model client fulfils
//! - [`TokenCounter`] — BPE token counting used for context budgets
//! - [`RetryPolicy`] / [`with_retry`] — the bounded-retry helper for
//!   transient backend failures

pub mod error;
pub mod generation;
pub mod retry;
pub mod tokens;
pub mod types;

pub use error::{Result, TutorError};
pub use generation::{GenerationBackend, GenerationRequest, GenerationResponse};
pub use retry::{RetryPolicy, with_retry};
pub use tokens::TokenCounter;
pub use types::{
    Answer, Citation, Grounding, InteractionRecord, Passage, RetrievalResult, ScoredPassage,
    TokenUsage,
};
