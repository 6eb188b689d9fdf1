//! HTTP contract tests over in-memory dependencies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use tutor_core::{Passage, Result, RetryPolicy, TokenCounter};
use tutor_engine::{AnswererConfig, DEFAULT_FALLBACK_MESSAGE, TutorEngine};
use tutor_governor::{Governor, GovernorConfig, InMemoryCounterStore, Quota};
use tutor_model::MockBackend;
use tutor_rag::{EmbeddingProvider, InMemoryVectorStore, Retriever, RetrieverConfig, VectorStore};
use tutor_server::{AppState, router};
use tutor_store::{InMemoryContentCache, InMemoryInteractionLog, InMemoryResponseCache};

struct KeywordEmbedder;

fn axis(index: usize) -> Vec<f32> {
    let mut v = vec![0.0; 4];
    v[index] = 1.0;
    v
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("backpropagation") { Ok(axis(0)) } else { Ok(axis(3)) }
    }
    fn dimensions(&self) -> usize {
        4
    }
    fn model_id(&self) -> &str {
        "keyword-test-v1"
    }
}

async fn app(governor: GovernorConfig) -> Router {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("textbook_passages", 4).await.unwrap();
    store
        .upsert(
            "textbook_passages",
            &[Passage {
                id: "p1".to_string(),
                text: "Gradients flow backwards through the network.".to_string(),
                embedding: axis(0),
                chapter_id: "neural-networks".to_string(),
                section_title: "Backprop".to_string(),
                position: 0,
            }],
        )
        .await
        .unwrap();

    let retriever = Arc::new(
        Retriever::new(RetrieverConfig::default(), Arc::new(KeywordEmbedder), store).unwrap(),
    );
    let backend = Arc::new(MockBackend::new().then_text(
        "Backpropagation pushes gradients backwards. [Source: neural-networks - Backprop]",
    ));

    let engine = TutorEngine::builder()
        .retriever(retriever)
        .backend(backend)
        .governor(Arc::new(Governor::new(governor, Arc::new(InMemoryCounterStore::new()))))
        .response_cache(Arc::new(InMemoryResponseCache::new()))
        .content_cache(Arc::new(InMemoryContentCache::new()))
        .interaction_log(Arc::new(InMemoryInteractionLog::new()))
        .token_counter(TokenCounter::new().unwrap())
        .answerer_config(AnswererConfig { retry: RetryPolicy::immediate(3), ..Default::default() })
        .build()
        .unwrap();

    router(AppState::new(Arc::new(engine)))
}

fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = app(GovernorConfig::default()).await;
    let response =
        app.oneshot(Request::get("/api/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn question_returns_answer_with_citations() {
    let app = app(GovernorConfig::default()).await;
    let response = app
        .oneshot(post_json(
            "/api/chat/question",
            Some("student-1"),
            json!({ "question": "How does backpropagation work?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["grounded"], "answered");
    assert_eq!(body["citations"][0]["chapter_id"], "neural-networks");
    assert_eq!(body["cached"], false);
    assert!(body["tokens_used"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn off_topic_question_is_refused_with_fallback_text() {
    let app = app(GovernorConfig::default()).await;
    let response = app
        .oneshot(post_json(
            "/api/chat/question",
            Some("student-1"),
            json!({ "question": "What's the weather today?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["grounded"], "refused");
    assert_eq!(body["answer"], DEFAULT_FALLBACK_MESSAGE);
    assert_eq!(body["citations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn rate_limited_question_gets_429_with_retry_after() {
    let config = GovernorConfig {
        question: Quota { limit: 1, window: Duration::from_secs(3600) },
        ..Default::default()
    };
    let app = app(config).await;

    let ok = app
        .clone()
        .oneshot(post_json(
            "/api/chat/question",
            Some("student-1"),
            json!({ "question": "How does backpropagation work?" }),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let denied = app
        .oneshot(post_json(
            "/api/chat/question",
            Some("student-1"),
            json!({ "question": "more backpropagation" }),
        ))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(denied.headers().contains_key("retry-after"));
    let body = body_json(denied).await;
    assert!(body["retry_after_seconds"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn empty_question_is_a_bad_request() {
    let app = app(GovernorConfig::default()).await;
    let response = app
        .oneshot(post_json("/api/chat/question", Some("student-1"), json!({ "question": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_requires_a_user_identity() {
    let app = app(GovernorConfig::default()).await;
    let response = app
        .oneshot(Request::get("/api/chat/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_lists_prior_exchanges() {
    let app = app(GovernorConfig::default()).await;
    app.clone()
        .oneshot(post_json(
            "/api/chat/question",
            Some("student-1"),
            json!({ "question": "How does backpropagation work?" }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::get("/api/chat/history?limit=10")
                .header("x-user-id", "student-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["question"], "How does backpropagation work?");
}

#[tokio::test]
async fn personalize_returns_content_and_caches() {
    let app = app(GovernorConfig::default()).await;
    let payload = json!({
        "chapter_id": "chapter-3-cnns",
        "chapter_content": "CNNs are neural networks for images.",
        "level": "beginner",
    });

    let first = app
        .clone()
        .oneshot(post_json("/api/personalize/chapter", Some("student-1"), payload.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["cached"], false);

    let second = app
        .oneshot(post_json("/api/personalize/chapter", Some("student-1"), payload))
        .await
        .unwrap();
    assert_eq!(body_json(second).await["cached"], true);
}

#[tokio::test]
async fn unknown_reading_level_is_a_bad_request() {
    let app = app(GovernorConfig::default()).await;
    let response = app
        .oneshot(post_json(
            "/api/personalize/chapter",
            Some("student-1"),
            json!({ "chapter_id": "c", "chapter_content": "text", "level": "expert" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_translation_language_is_a_bad_request() {
    let app = app(GovernorConfig::default()).await;
    let response = app
        .oneshot(post_json(
            "/api/translate/chapter",
            Some("student-1"),
            json!({ "chapter_id": "c", "chapter_content": "text", "language": "fr" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
