//! Scripted generation backend for tests and local development.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use tutor_core::{
    GenerationBackend, GenerationRequest, GenerationResponse, Result, TokenUsage, TutorError,
};

/// A [`GenerationBackend`] that replays scripted outcomes in order and
/// counts invocations.
///
/// Once the script is exhausted the last scripted outcome repeats. An
/// empty script always fails, which keeps "the backend must never be
/// invoked" assertions honest.
///
/// # Example
///
/// ```rust,ignore
/// let backend = MockBackend::new()
///     .then_transient_failure()
///     .then_text("Grounded answer. [Source: cnns - Intro]");
///
/// // First call errors, second succeeds; backend.calls() == 2.
/// ```
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

#[derive(Clone)]
enum Outcome {
    Text { text: String, usage: TokenUsage },
    TransientFailure,
}

impl MockBackend {
    /// Create a backend with an empty script (every call fails).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful response with a nominal token usage.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then_text_with_usage(text, TokenUsage { input_tokens: 200, output_tokens: 50 })
    }

    /// Append a successful response with explicit token usage.
    pub fn then_text_with_usage(self, text: impl Into<String>, usage: TokenUsage) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Outcome::Text { text: text.into(), usage });
        self
    }

    /// Append a transient failure (retryable).
    pub fn then_transient_failure(self) -> Self {
        self.script.lock().expect("script lock").push_back(Outcome::TransientFailure);
        self
    }

    /// Number of `generate` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, for prompt assertions.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("request lock") = Some(request);

        let outcome = {
            let mut script = self.script.lock().expect("script lock");
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match outcome {
            Some(Outcome::Text { text, usage }) => Ok(GenerationResponse { text, usage }),
            Some(Outcome::TransientFailure) => Err(TutorError::Generation {
                provider: "mock".into(),
                message: "scripted transient failure".into(),
            }),
            None => Err(TutorError::Generation {
                provider: "mock".into(),
                message: "mock backend has no scripted responses".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order_then_repeats_last() {
        let backend = MockBackend::new().then_transient_failure().then_text("answer");

        let request = GenerationRequest {
            system: "s".into(),
            user: "u".into(),
            max_tokens: 100,
        };

        assert!(backend.generate(request.clone()).await.is_err());
        assert_eq!(backend.generate(request.clone()).await.unwrap().text, "answer");
        assert_eq!(backend.generate(request).await.unwrap().text, "answer");
        assert_eq!(backend.calls(), 3);
    }
}
