//! Caching and durable records for the Tutor engine.
//!
//! Three concerns live here, all behind traits with in-memory and
//! (feature-gated) Postgres implementations:
//!
//! - [`fingerprint`] — the versioned question-normalization function that
//!   is the single source of truth for cache keys
//! - [`ResponseCache`] / [`ContentCache`] — content-addressed answer
//!   caching, plus the simpler keyed caches the personalization and
//!   translation flows share
//! - [`InteractionLog`] — the append-only question/answer audit record

pub mod cache;
pub mod fingerprint;
pub mod log;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use cache::{
    ContentCache, InMemoryContentCache, InMemoryResponseCache, ResponseCache, personalization_key,
    translation_key,
};
pub use fingerprint::{FINGERPRINT_VERSION, fingerprint, normalize_question};
pub use log::{InMemoryInteractionLog, InteractionLog};
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
