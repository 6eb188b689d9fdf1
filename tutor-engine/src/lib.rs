//! The Tutor answer engine.
//!
//! [`TutorEngine`] composes the retrieval, governance, caching, and
//! generation crates into the full question pipeline — admission check,
//! cache lookup, retrieve, assemble, grounded generation, then cache and
//! log writes — plus the personalization and translation flows that share
//! its governor and caches.
//!
//! The engine's central guarantee is **grounding**: an answer classified
//! as answered carries only citations that trace back to passages actually
//! supplied to the model, and a question the textbook cannot answer gets a
//! deterministic refusal instead of a hallucination.

pub mod answerer;
pub mod engine;
pub mod flows;
pub mod prompt;

pub use answerer::{AnswererConfig, DEFAULT_FALLBACK_MESSAGE, GroundedAnswerer};
pub use engine::{AskReply, AskRequest, AskResponse, EngineConfig, TutorEngine, TutorEngineBuilder};
pub use flows::{FlowReply, FlowResponse, ReadingLevel};
