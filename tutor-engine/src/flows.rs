//! Personalization and translation: the cache-and-generate sibling flows.
//!
//! Structurally these are the ask pipeline minus retrieval and grounding —
//! admission through the same governor, lookup in the shared content
//! cache, one generation call, cache write. Neither flow cites sources,
//! so no grounding validation applies.

use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use tutor_core::{GenerationRequest, GenerationResponse, Result, TutorError, with_retry};
use tutor_governor::{Admission, UsageKind};
use tutor_store::{personalization_key, translation_key};

use crate::engine::TutorEngine;
use crate::prompt;

/// The only translation target the textbook ships.
const SUPPORTED_LANGUAGE: &str = "ur";

/// Reading level for chapter personalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingLevel {
    /// Simple language, many examples, no jargon.
    Beginner,
    /// Theory and practice balanced, coding examples.
    Intermediate,
    /// Full technical depth.
    Advanced,
}

impl ReadingLevel {
    /// The level's canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingLevel::Beginner => "beginner",
            ReadingLevel::Intermediate => "intermediate",
            ReadingLevel::Advanced => "advanced",
        }
    }
}

impl FromStr for ReadingLevel {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(ReadingLevel::Beginner),
            "intermediate" => Ok(ReadingLevel::Intermediate),
            "advanced" => Ok(ReadingLevel::Advanced),
            other => Err(TutorError::InvalidQuery(format!(
                "unknown reading level '{other}' (expected beginner, intermediate, or advanced)"
            ))),
        }
    }
}

/// A completed personalization or translation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowResponse {
    /// The generated (or cached) content.
    pub content: String,
    /// Whether the content came from the cache.
    pub cached: bool,
    /// Wall-clock time spent serving this request.
    pub response_time_ms: u64,
    /// Tokens spent by the generation call; zero on cache hits.
    pub tokens_used: u64,
}

/// The outcome of a sibling flow: content, or a structured denial.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowReply {
    /// The flow completed.
    Completed(FlowResponse),
    /// The caller's window is exhausted.
    RateLimited {
        /// How long until the window rolls over.
        retry_after: Duration,
    },
}

impl TutorEngine {
    /// Adapt a chapter's content to a reading level.
    ///
    /// Cached per `(chapter, level)`: the first request per pair pays for
    /// generation, every later one is served from the content cache.
    pub async fn personalize(
        &self,
        chapter_id: &str,
        chapter_content: &str,
        level: ReadingLevel,
        user_id: Option<&str>,
    ) -> Result<FlowReply> {
        let started = Instant::now();
        if chapter_content.trim().is_empty() {
            return Err(TutorError::InvalidQuery("chapter content must not be empty".to_string()));
        }

        let admission = self.governor.admit(user_id, UsageKind::Personalization).await?;
        if let Admission::Denied { retry_after } = admission {
            info!(chapter_id, retry_after_secs = retry_after.as_secs(), "personalization rate limited");
            return Ok(FlowReply::RateLimited { retry_after });
        }

        let key = personalization_key(chapter_id, level.as_str());
        if let Some(content) = self.cached_content(&key).await {
            return Ok(FlowReply::Completed(FlowResponse {
                content,
                cached: true,
                response_time_ms: started.elapsed().as_millis() as u64,
                tokens_used: 0,
            }));
        }

        let response = self
            .generate_flow(
                prompt::personalize_system_prompt(level.as_str()),
                prompt::personalize_user_prompt(chapter_content, level.as_str()),
                self.config.personalize_max_tokens,
            )
            .await?;

        self.finish_flow(&key, &response).await;
        info!(chapter_id, level = level.as_str(), tokens = response.usage.total(), "chapter personalized");
        Ok(FlowReply::Completed(FlowResponse {
            content: response.text,
            cached: false,
            response_time_ms: started.elapsed().as_millis() as u64,
            tokens_used: response.usage.total(),
        }))
    }

    /// Translate a chapter's content to educational Urdu.
    ///
    /// Cached per `(chapter, language)`. Languages other than `ur` are
    /// rejected as unsupported.
    pub async fn translate(
        &self,
        chapter_id: &str,
        chapter_content: &str,
        language: &str,
        user_id: Option<&str>,
    ) -> Result<FlowReply> {
        let started = Instant::now();
        if chapter_content.trim().is_empty() {
            return Err(TutorError::InvalidQuery("chapter content must not be empty".to_string()));
        }
        if language != SUPPORTED_LANGUAGE {
            return Err(TutorError::InvalidQuery(format!(
                "unsupported language '{language}' (only '{SUPPORTED_LANGUAGE}' is available)"
            )));
        }

        let admission = self.governor.admit(user_id, UsageKind::Translation).await?;
        if let Admission::Denied { retry_after } = admission {
            info!(chapter_id, retry_after_secs = retry_after.as_secs(), "translation rate limited");
            return Ok(FlowReply::RateLimited { retry_after });
        }

        let key = translation_key(chapter_id, language);
        if let Some(content) = self.cached_content(&key).await {
            return Ok(FlowReply::Completed(FlowResponse {
                content,
                cached: true,
                response_time_ms: started.elapsed().as_millis() as u64,
                tokens_used: 0,
            }));
        }

        let response = self
            .generate_flow(
                prompt::TRANSLATE_SYSTEM_PROMPT.to_string(),
                prompt::translate_user_prompt(chapter_content),
                self.config.translate_max_tokens,
            )
            .await?;

        self.finish_flow(&key, &response).await;
        info!(chapter_id, language, tokens = response.usage.total(), "chapter translated");
        Ok(FlowReply::Completed(FlowResponse {
            content: response.text,
            cached: false,
            response_time_ms: started.elapsed().as_millis() as u64,
            tokens_used: response.usage.total(),
        }))
    }

    async fn cached_content(&self, key: &str) -> Option<String> {
        match self.content_cache.get_content(key).await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "content cache read failed, treating as miss");
                None
            }
        }
    }

    async fn generate_flow(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> Result<GenerationResponse> {
        let request = GenerationRequest { system, user, max_tokens };
        with_retry(&self.retry, || self.backend.generate(request.clone())).await.map_err(|e| {
            match e {
                TutorError::Generation { message, .. } => {
                    TutorError::GenerationUnavailable { message }
                }
                other => other,
            }
        })
    }

    /// Spend accounting and cache write; both best-effort.
    async fn finish_flow(&self, key: &str, response: &GenerationResponse) {
        if let Err(e) = self.governor.record_spend(response.usage).await {
            warn!(error = %e, "token spend recording failed");
        }
        if let Err(e) = self.content_cache.put_content(key, &response.text).await {
            warn!(error = %e, "content cache write failed");
        }
    }
}
