//! Generation backends for the Tutor engine.
//!
//! [`AnthropicBackend`] speaks the Anthropic Messages API (the production
//! backend); [`MockBackend`] is a scripted stand-in for tests and local
//! development. Both implement [`tutor_core::GenerationBackend`], so the
//! rest of the pipeline never knows which vendor is behind it.

pub mod anthropic;
pub mod mock;
mod parse;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use mock::MockBackend;
