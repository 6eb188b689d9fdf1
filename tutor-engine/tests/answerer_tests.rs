//! Grounding guarantees: citation validation, refusal short-circuits, retry.

use std::sync::Arc;

use tutor_core::{Grounding, Passage, RetryPolicy, ScoredPassage, TokenCounter, TutorError};
use tutor_engine::{AnswererConfig, DEFAULT_FALLBACK_MESSAGE, GroundedAnswerer};
use tutor_model::MockBackend;
use tutor_rag::{AssembledContext, AssemblerConfig, ContextAssembler};

fn passage(chapter: &str, section: &str, position: u32, text: &str) -> ScoredPassage {
    ScoredPassage {
        passage: Passage {
            id: format!("{chapter}-{position}"),
            text: text.to_string(),
            embedding: vec![],
            chapter_id: chapter.to_string(),
            section_title: section.to_string(),
            position,
        },
        score: 0.9,
    }
}

fn backprop_context() -> AssembledContext {
    let retrieval = vec![
        passage("neural-networks", "Backprop", 0, "Gradients flow backwards through layers."),
        passage("neural-networks", "Chain Rule", 1, "The chain rule composes derivatives."),
    ];
    ContextAssembler::new(AssemblerConfig::default(), TokenCounter::new().unwrap())
        .assemble(&retrieval, None)
}

fn answerer(backend: Arc<MockBackend>) -> GroundedAnswerer {
    let config = AnswererConfig { retry: RetryPolicy::immediate(3), ..Default::default() };
    GroundedAnswerer::new(backend, TokenCounter::new().unwrap(), config)
}

#[tokio::test]
async fn empty_context_refuses_without_invoking_the_backend() {
    let backend = Arc::new(MockBackend::new().then_text("should never be used"));
    let answer =
        answerer(backend.clone()).answer(AssembledContext::default(), "anything").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Refused);
    assert_eq!(answer.text, DEFAULT_FALLBACK_MESSAGE);
    assert!(answer.citations.is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn valid_citations_are_kept_and_answer_is_grounded() {
    let backend = Arc::new(MockBackend::new().then_text(
        "Backpropagation sends gradients backwards. [Source: neural-networks - Backprop] \
         It relies on the chain rule. [Source: neural-networks - Chain Rule]",
    ));
    let answer = answerer(backend.clone())
        .answer(backprop_context(), "How does backpropagation work?")
        .await
        .unwrap();

    assert_eq!(answer.grounding, Grounding::Answered);
    assert_eq!(answer.citations.len(), 2);
    assert!(answer.citations.iter().all(|c| c.chapter_id == "neural-networks"));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn fabricated_citations_are_stripped() {
    let backend = Arc::new(MockBackend::new().then_text(
        "Real claim. [Source: neural-networks - Backprop] \
         Fabricated claim. [Source: quantum-computing - Qubits]",
    ));
    let answer = answerer(backend).answer(backprop_context(), "question").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Answered);
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.citations[0].chapter_id, "neural-networks");
    assert!(!answer.text.contains("quantum-computing"));
}

#[tokio::test]
async fn all_citations_fabricated_downgrades_to_refusal() {
    let backend = Arc::new(
        MockBackend::new().then_text("Confident nonsense. [Source: quantum-computing - Qubits]"),
    );
    let answer = answerer(backend).answer(backprop_context(), "question").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Refused);
    assert_eq!(answer.text, DEFAULT_FALLBACK_MESSAGE);
    assert!(answer.citations.is_empty());
}

#[tokio::test]
async fn uncited_answer_downgrades_to_refusal() {
    let backend = Arc::new(MockBackend::new().then_text("An answer with no citations at all."));
    let answer = answerer(backend).answer(backprop_context(), "question").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Refused);
}

#[tokio::test]
async fn refusal_marker_maps_to_refused() {
    let backend = Arc::new(MockBackend::new().then_text("INSUFFICIENT_CONTEXT"));
    let answer = answerer(backend.clone()).answer(backprop_context(), "question").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Refused);
    assert_eq!(answer.text, DEFAULT_FALLBACK_MESSAGE);
    // The backend was consulted; its token spend still counts.
    assert_eq!(backend.calls(), 1);
    assert!(answer.usage.total() > 0);
}

#[tokio::test]
async fn transient_failures_are_retried_then_succeed() {
    let backend = Arc::new(
        MockBackend::new()
            .then_transient_failure()
            .then_transient_failure()
            .then_text("Answer. [Source: neural-networks - Backprop]"),
    );
    let answer = answerer(backend.clone()).answer(backprop_context(), "question").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Answered);
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_generation_unavailable() {
    let backend = Arc::new(MockBackend::new().then_transient_failure());
    let err = answerer(backend.clone()).answer(backprop_context(), "question").await.unwrap_err();

    assert!(matches!(err, TutorError::GenerationUnavailable { .. }));
    // Initial attempt + 3 retries.
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn oversized_context_is_shrunk_before_generation() {
    let backend = Arc::new(MockBackend::new().then_text("Ok. [Source: neural-networks - Backprop]"));
    let counter = TokenCounter::new().unwrap();
    let question = "How does backpropagation work?";

    // Pick a ceiling that leaves room for exactly the first passage after
    // the instruction/question overhead the answerer reserves.
    let context = backprop_context();
    let first_passage_tokens = context.passages()[0].tokens;
    let overhead = counter.count(tutor_engine::prompt::GROUNDED_SYSTEM_PROMPT)
        + counter.count(question)
        + 64;
    let config = AnswererConfig {
        input_token_ceiling: overhead + first_passage_tokens,
        retry: RetryPolicy::immediate(0),
        ..Default::default()
    };
    let answerer = GroundedAnswerer::new(backend.clone(), counter, config);

    let answer = answerer.answer(context, question).await.unwrap();
    // The highest-scored passage survives the shrink, so the citation is valid.
    assert_eq!(answer.grounding, Grounding::Answered);
    let sent = backend.last_request().unwrap();
    assert!(sent.user.contains("[Source: neural-networks - Backprop]"));
    assert!(!sent.user.contains("[Source: neural-networks - Chain Rule]"));
}
