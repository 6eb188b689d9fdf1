//! HTTP handlers and error mapping.
//!
//! Only three failure classes are user-visible — retrieval outage,
//! generation outage, and rate limiting — and each maps to a clear,
//! non-technical message. Everything else is logged server-side and comes
//! back as a generic 500; internal errors never leak.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use tutor_core::{Citation, Grounding, TutorError};
use tutor_engine::{AskReply, AskRequest, FlowReply, ReadingLevel};

use crate::state::AppState;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/chat/question", post(ask_question))
        .route("/api/chat/history", get(chat_history))
        .route("/api/personalize/chapter", post(personalize_chapter))
        .route("/api/translate/chapter", post(translate_chapter))
        .with_state(state)
}

/// A user-facing API error: status code plus a non-technical detail line.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }
}

impl From<TutorError> for ApiError {
    fn from(e: TutorError) -> Self {
        match &e {
            TutorError::InvalidQuery(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, message.clone())
            }
            TutorError::RetrievalUnavailable { .. } => {
                error!(error = %e, "retrieval unavailable");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Textbook search is temporarily unavailable. Please try again in a moment.",
                )
            }
            TutorError::GenerationUnavailable { .. }
            | TutorError::Generation { .. }
            | TutorError::GenerationRejected { .. } => {
                error!(error = %e, "generation unavailable");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The AI tutor is busy right now. Please try again shortly.",
                )
            }
            _ => {
                error!(error = %e, "internal error");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our side. Please try again.",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// 429 with `retry_after_seconds`, shaped distinctly from an answer.
fn rate_limited(retry_after: std::time::Duration) -> Response {
    let seconds = retry_after.as_secs().max(1);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("retry-after", seconds.to_string())],
        Json(json!({
            "detail": "You have reached your usage limit. Please try again later.",
            "retry_after_seconds": seconds,
        })),
    )
        .into_response()
}

/// Opaque caller identity from the `x-user-id` header; absent is anonymous.
fn caller(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Tutor API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Deserialize)]
struct AskPayload {
    question: String,
    #[serde(default)]
    selected_text: Option<String>,
    #[serde(default)]
    chapter_scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct CitationBody {
    chapter_id: String,
    section_title: String,
}

impl From<Citation> for CitationBody {
    fn from(c: Citation) -> Self {
        Self { chapter_id: c.chapter_id, section_title: c.section_title }
    }
}

#[derive(Debug, Serialize)]
struct AnswerBody {
    answer: String,
    citations: Vec<CitationBody>,
    grounded: Grounding,
    response_time_ms: u64,
    tokens_used: u64,
    cached: bool,
}

async fn ask_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AskPayload>,
) -> Result<Response, ApiError> {
    let request = AskRequest {
        question: payload.question,
        selected_text: payload.selected_text,
        user_id: caller(&headers),
        chapter_scope: payload.chapter_scope,
    };

    match state.engine.ask(request).await? {
        AskReply::Answered(response) => Ok(Json(AnswerBody {
            answer: response.answer,
            citations: response.citations.into_iter().map(Into::into).collect(),
            grounded: response.grounded,
            response_time_ms: response.response_time_ms,
            tokens_used: response.tokens_used,
            cached: response.cached,
        })
        .into_response()),
        AskReply::RateLimited { retry_after } => Ok(rate_limited(retry_after)),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    question: String,
    answer: String,
    citations: Vec<CitationBody>,
    created_at: DateTime<Utc>,
}

async fn chat_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Some(user) = caller(&headers) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "A user identity is required to read chat history.",
        ));
    };

    let records = state.engine.history(&user, query.limit).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| HistoryEntry {
                question: r.question,
                answer: r.answer_text,
                citations: r.citations.into_iter().map(Into::into).collect(),
                created_at: r.timestamp,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct PersonalizePayload {
    chapter_id: String,
    chapter_content: String,
    level: String,
}

#[derive(Debug, Serialize)]
struct FlowBody {
    content: String,
    cached: bool,
    response_time_ms: u64,
    tokens_used: u64,
}

async fn personalize_chapter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PersonalizePayload>,
) -> Result<Response, ApiError> {
    let level: ReadingLevel = payload.level.parse()?;
    let reply = state
        .engine
        .personalize(
            &payload.chapter_id,
            &payload.chapter_content,
            level,
            caller(&headers).as_deref(),
        )
        .await?;
    Ok(flow_response(reply))
}

#[derive(Debug, Deserialize)]
struct TranslatePayload {
    chapter_id: String,
    chapter_content: String,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "ur".to_string()
}

async fn translate_chapter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TranslatePayload>,
) -> Result<Response, ApiError> {
    let reply = state
        .engine
        .translate(
            &payload.chapter_id,
            &payload.chapter_content,
            &payload.language,
            caller(&headers).as_deref(),
        )
        .await?;
    Ok(flow_response(reply))
}

fn flow_response(reply: FlowReply) -> Response {
    match reply {
        FlowReply::Completed(response) => Json(FlowBody {
            content: response.content,
            cached: response.cached,
            response_time_ms: response.response_time_ms,
            tokens_used: response.tokens_used,
        })
        .into_response(),
        FlowReply::RateLimited { retry_after } => rate_limited(retry_after),
    }
}
