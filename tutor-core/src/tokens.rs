//! Token counting via tiktoken-rs BPE.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::error::{Result, TutorError};

/// A BPE token counter shared across the pipeline.
///
/// Context budgets, the input-token ceiling, and spend estimates must all
/// agree on one tokenization, so a single counter is constructed at startup
/// and cloned (cheaply, via `Arc`) into every component that measures text.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    /// Create a counter using the `cl100k_base` encoding.
    ///
    /// The exact tokenizer only needs to be stable, not identical to the
    /// generation backend's: budgets are enforced against this count and
    /// the backend reports its own usage for billing.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::Config`] if the encoding data cannot be loaded.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| TutorError::Config(format!("failed to load cl100k_base encoding: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Count the tokens in a string.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").field("encoding", &"cl100k_base").finish()
    }
}
