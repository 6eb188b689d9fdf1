//! The ask pipeline: admission, cache, retrieval, assembly, generation,
//! logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use tutor_core::{
    Answer, Citation, GenerationBackend, Grounding, InteractionRecord, Result, RetryPolicy,
    TokenCounter, TutorError,
};
use tutor_governor::{Admission, Governor, UsageKind};
use tutor_rag::{AssemblerConfig, ContextAssembler, Retriever};
use tutor_store::{ContentCache, InteractionLog, ResponseCache, fingerprint};

use crate::answerer::{AnswererConfig, GroundedAnswerer};

/// Engine-level policy knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Treat a retrieval outage as an empty retrieval instead of failing
    /// the request. Off by default: callers see a clear "search
    /// unavailable" state rather than silently ungrounded refusals.
    pub degrade_on_retrieval_failure: bool,
    /// Output-token ceiling for chapter personalization.
    pub personalize_max_tokens: u32,
    /// Output-token ceiling for chapter translation.
    pub translate_max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            degrade_on_retrieval_failure: false,
            personalize_max_tokens: 2000,
            translate_max_tokens: 3000,
        }
    }
}

/// An inbound question.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    /// The question text.
    pub question: String,
    /// Text the reader highlighted; takes precedence over retrieval as
    /// context scope.
    pub selected_text: Option<String>,
    /// Opaque caller identity; `None` is anonymous.
    pub user_id: Option<String>,
    /// Restrict citations to one chapter.
    pub chapter_scope: Option<String>,
}

/// A completed answer, as returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AskResponse {
    /// The answer (or refusal) text.
    pub answer: String,
    /// Citations into the textbook.
    pub citations: Vec<Citation>,
    /// Whether the question was answered or refused.
    pub grounded: Grounding,
    /// Wall-clock time spent serving this request.
    pub response_time_ms: u64,
    /// Tokens spent by the generation call (zero for refusal
    /// short-circuits).
    pub tokens_used: u64,
    /// Whether the answer came from the response cache.
    pub cached: bool,
}

/// The outcome of [`TutorEngine::ask`]: an answer, or a structured
/// rate-limit denial. Denial is not an error — it is an expected,
/// frequent outcome with its own response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AskReply {
    /// The pipeline ran (or the cache hit) and produced an answer.
    Answered(AskResponse),
    /// The caller's window is exhausted.
    RateLimited {
        /// How long until the window rolls over.
        retry_after: Duration,
    },
}

/// The question-answering engine.
///
/// One engine serves many concurrent questions; per-request state never
/// escapes [`ask`](TutorEngine::ask), and the only shared mutable state is
/// behind the governor's counter store and the caches. Stages within one
/// request run strictly in order — admit, cache lookup, retrieve,
/// assemble, answer, then cache and log writes — and each side effect
/// commits independently (a failed log write never takes back an answer).
///
/// # Example
///
/// ```rust,ignore
/// use tutor_engine::{AskReply, AskRequest, TutorEngine};
///
/// let engine: TutorEngine = TutorEngine::builder()
///     .retriever(retriever)
///     .backend(backend)
///     .governor(governor)
///     .response_cache(cache)
///     .content_cache(content_cache)
///     .interaction_log(log)
///     .token_counter(counter)
///     .build()?;
///
/// match engine.ask(AskRequest { question: "What is a CNN?".into(), ..Default::default() }).await? {
///     AskReply::Answered(response) => println!("{}", response.answer),
///     AskReply::RateLimited { retry_after } => println!("retry in {retry_after:?}"),
/// }
/// ```
pub struct TutorEngine {
    retriever: Arc<Retriever>,
    assembler: ContextAssembler,
    answerer: GroundedAnswerer,
    pub(crate) backend: Arc<dyn GenerationBackend>,
    pub(crate) governor: Arc<Governor>,
    response_cache: Arc<dyn ResponseCache>,
    pub(crate) content_cache: Arc<dyn ContentCache>,
    interaction_log: Arc<dyn InteractionLog>,
    pub(crate) retry: RetryPolicy,
    pub(crate) config: EngineConfig,
}

impl TutorEngine {
    /// Create a new [`TutorEngineBuilder`].
    pub fn builder() -> TutorEngineBuilder {
        TutorEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer a question through the full pipeline.
    ///
    /// Flow: admission check → cache lookup → retrieve → assemble →
    /// grounded generation → cache and log writes. Cache and log failures
    /// degrade gracefully (the answer is still returned); retrieval and
    /// generation outages surface as
    /// [`TutorError::RetrievalUnavailable`] /
    /// [`TutorError::GenerationUnavailable`].
    pub async fn ask(&self, request: AskRequest) -> Result<AskReply> {
        let started = Instant::now();
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(TutorError::InvalidQuery("question must not be empty".to_string()));
        }

        // Admission is counted here and never rolled back, even if the
        // caller disconnects or a later stage fails.
        let admission =
            self.governor.admit(request.user_id.as_deref(), UsageKind::Question).await?;
        if let Admission::Denied { retry_after } = admission {
            info!(retry_after_secs = retry_after.as_secs(), "question rate limited");
            return Ok(AskReply::RateLimited { retry_after });
        }

        let key = fingerprint(
            &question,
            request.selected_text.as_deref(),
            request.chapter_scope.as_deref(),
        );

        match self.response_cache.get(&key).await {
            Ok(Some(answer)) => {
                debug!(fingerprint = %key, "response cache hit");
                self.log_interaction(&request, &question, &answer).await;
                return Ok(AskReply::Answered(Self::to_response(answer, started, true)));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "response cache read failed, treating as miss"),
        }

        let retrieval = match self.retriever.retrieve(&question).await {
            Ok(results) => results,
            Err(e @ TutorError::RetrievalUnavailable { .. })
                if self.config.degrade_on_retrieval_failure =>
            {
                warn!(error = %e, "retrieval unavailable, degrading to empty context");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let retrieval = match &request.chapter_scope {
            Some(scope) => retrieval
                .into_iter()
                .filter(|scored| scored.passage.chapter_id == *scope)
                .collect(),
            None => retrieval,
        };

        let context = self.assembler.assemble(&retrieval, request.selected_text.as_deref());
        let answer = self.answerer.answer(context, &question).await?;

        if let Err(e) = self.governor.record_spend(answer.usage).await {
            warn!(error = %e, "token spend recording failed");
        }
        if let Err(e) = self.response_cache.put(&key, &answer).await {
            warn!(error = %e, "response cache write failed");
        }
        self.log_interaction(&request, &question, &answer).await;

        info!(
            grounded = ?answer.grounding,
            citations = answer.citations.len(),
            tokens = answer.usage.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );
        Ok(AskReply::Answered(Self::to_response(answer, started, false)))
    }

    /// The caller's most recent exchanges, newest first. `limit` is capped
    /// at 100.
    pub async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<InteractionRecord>> {
        self.interaction_log.recent(user_id, limit.min(100)).await
    }

    /// Best-effort log write; failure is monitored, never propagated.
    async fn log_interaction(&self, request: &AskRequest, question: &str, answer: &Answer) {
        let record = InteractionRecord {
            user_id: request.user_id.clone(),
            question: question.to_string(),
            answer_text: answer.text.clone(),
            citations: answer.citations.clone(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.interaction_log.record(&record).await {
            warn!(error = %e, "interaction log write failed");
        }
    }

    fn to_response(answer: Answer, started: Instant, cached: bool) -> AskResponse {
        AskResponse {
            answer: answer.text,
            citations: answer.citations,
            grounded: answer.grounding,
            response_time_ms: started.elapsed().as_millis() as u64,
            tokens_used: answer.usage.total(),
            cached,
        }
    }
}

/// Builder for constructing a [`TutorEngine`].
///
/// The retriever, backend, governor, stores, and token counter are
/// required; configurations default sensibly.
#[derive(Default)]
pub struct TutorEngineBuilder {
    retriever: Option<Arc<Retriever>>,
    backend: Option<Arc<dyn GenerationBackend>>,
    governor: Option<Arc<Governor>>,
    response_cache: Option<Arc<dyn ResponseCache>>,
    content_cache: Option<Arc<dyn ContentCache>>,
    interaction_log: Option<Arc<dyn InteractionLog>>,
    token_counter: Option<TokenCounter>,
    assembler_config: Option<AssemblerConfig>,
    answerer_config: Option<AnswererConfig>,
    engine_config: Option<EngineConfig>,
}

impl TutorEngineBuilder {
    /// Set the retriever.
    pub fn retriever(mut self, retriever: Arc<Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set the generation backend.
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the rate governor.
    pub fn governor(mut self, governor: Arc<Governor>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Set the response cache.
    pub fn response_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.response_cache = Some(cache);
        self
    }

    /// Set the content cache shared by personalization and translation.
    pub fn content_cache(mut self, cache: Arc<dyn ContentCache>) -> Self {
        self.content_cache = Some(cache);
        self
    }

    /// Set the interaction log.
    pub fn interaction_log(mut self, log: Arc<dyn InteractionLog>) -> Self {
        self.interaction_log = Some(log);
        self
    }

    /// Set the shared token counter.
    pub fn token_counter(mut self, counter: TokenCounter) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Override the assembler configuration.
    pub fn assembler_config(mut self, config: AssemblerConfig) -> Self {
        self.assembler_config = Some(config);
        self
    }

    /// Override the answerer configuration.
    pub fn answerer_config(mut self, config: AnswererConfig) -> Self {
        self.answerer_config = Some(config);
        self
    }

    /// Override the engine configuration.
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = Some(config);
        self
    }

    /// Build the [`TutorEngine`], validating that all dependencies are set.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::Config`] if a required dependency is missing.
    pub fn build(self) -> Result<TutorEngine> {
        let retriever =
            self.retriever.ok_or_else(|| TutorError::Config("retriever is required".into()))?;
        let backend =
            self.backend.ok_or_else(|| TutorError::Config("backend is required".into()))?;
        let governor =
            self.governor.ok_or_else(|| TutorError::Config("governor is required".into()))?;
        let response_cache = self
            .response_cache
            .ok_or_else(|| TutorError::Config("response_cache is required".into()))?;
        let content_cache = self
            .content_cache
            .ok_or_else(|| TutorError::Config("content_cache is required".into()))?;
        let interaction_log = self
            .interaction_log
            .ok_or_else(|| TutorError::Config("interaction_log is required".into()))?;
        let counter = self
            .token_counter
            .ok_or_else(|| TutorError::Config("token_counter is required".into()))?;

        let assembler =
            ContextAssembler::new(self.assembler_config.unwrap_or_default(), counter.clone());
        let answerer_config = self.answerer_config.unwrap_or_default();
        let retry = answerer_config.retry.clone();
        let answerer = GroundedAnswerer::new(backend.clone(), counter, answerer_config);

        Ok(TutorEngine {
            retriever,
            assembler,
            answerer,
            backend,
            governor,
            response_cache,
            content_cache,
            interaction_log,
            retry,
            config: self.engine_config.unwrap_or_default(),
        })
    }
}
