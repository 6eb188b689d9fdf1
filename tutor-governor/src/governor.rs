//! Admission control and token-spend tracking.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tutor_core::{Result, TokenUsage};

use crate::counters::CounterStore;

/// The identity anonymous callers are bucketed under.
///
/// Anonymous traffic shares one window rather than being denied outright;
/// whichever policy is chosen it must be applied consistently, and this
/// constant is the single place it is defined.
const ANONYMOUS_BUCKET: &str = "anonymous";

/// The governed request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    /// A RAG question.
    Question,
    /// A chapter personalization request.
    Personalization,
    /// A chapter translation request.
    Translation,
}

impl UsageKind {
    fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Question => "question",
            UsageKind::Personalization => "personalization",
            UsageKind::Translation => "translation",
        }
    }
}

/// A fixed-window quota: at most `limit` admissions per `window`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quota {
    /// Maximum admissions per window.
    pub limit: u32,
    /// Window length.
    #[serde(with = "duration_secs")]
    pub window: Duration,
}

/// Governor configuration: one quota per kind plus the daily token budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernorConfig {
    /// Quota for questions (default 20/hour).
    pub question: Quota,
    /// Quota for personalizations (default 5/day).
    pub personalization: Quota,
    /// Quota for translations (default 5/day).
    pub translation: Quota,
    /// Soft daily token budget across all users.
    pub daily_token_budget: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            question: Quota { limit: 20, window: Duration::from_secs(3600) },
            personalization: Quota { limit: 5, window: Duration::from_secs(86_400) },
            translation: Quota { limit: 5, window: Duration::from_secs(86_400) },
            daily_token_budget: 1_000_000,
        }
    }
}

impl GovernorConfig {
    fn quota_for(&self, kind: UsageKind) -> Quota {
        match kind {
            UsageKind::Question => self.question,
            UsageKind::Personalization => self.personalization,
            UsageKind::Translation => self.translation,
        }
    }
}

/// The outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed.
    Allowed,
    /// The window is exhausted; retry once it rolls over.
    Denied {
        /// How long until the current window ends.
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Tracks per-user request windows and global token spend.
///
/// Counters are incremented at admission time and never rolled back —
/// a cancelled or failed request still consumed its slot, which keeps
/// cancel-and-retry from becoming a quota bypass. Exceeding the daily
/// token budget is a soft signal (a warning for monitoring), not a
/// request-time rejection: a hard block would let cost overrun deny
/// service to legitimate users.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_governor::{Governor, GovernorConfig, InMemoryCounterStore, UsageKind};
///
/// let governor = Governor::new(GovernorConfig::default(), Arc::new(InMemoryCounterStore::new()));
/// match governor.admit(Some("user-7"), UsageKind::Question).await? {
///     Admission::Allowed => { /* run the pipeline */ }
///     Admission::Denied { retry_after } => { /* 429 with retry_after */ }
/// }
/// ```
pub struct Governor {
    config: GovernorConfig,
    store: Arc<dyn CounterStore>,
}

impl Governor {
    /// Create a governor over the given counter store.
    pub fn new(config: GovernorConfig, store: Arc<dyn CounterStore>) -> Self {
        Self { config, store }
    }

    /// Return a reference to the governor configuration.
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Check and count an admission for `user` (or the anonymous bucket).
    pub async fn admit(&self, user: Option<&str>, kind: UsageKind) -> Result<Admission> {
        self.admit_at(user, kind, Utc::now()).await
    }

    /// Admission check at an explicit instant.
    pub async fn admit_at(
        &self,
        user: Option<&str>,
        kind: UsageKind,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let identity = user.filter(|u| !u.trim().is_empty()).unwrap_or(ANONYMOUS_BUCKET);
        let quota = self.config.quota_for(kind);
        let key = format!("{}:{identity}", kind.as_str());

        let usage = self.store.increment(&key, quota.window, now).await?;

        if usage.count > quota.limit {
            let window_end = usage.window_start
                + chrono::Duration::from_std(quota.window).unwrap_or(chrono::Duration::zero());
            let retry_after =
                (window_end - now).to_std().unwrap_or(Duration::from_secs(1)).max(Duration::from_secs(1));
            debug!(
                user = identity,
                kind = kind.as_str(),
                count = usage.count,
                limit = quota.limit,
                retry_after_secs = retry_after.as_secs(),
                "admission denied"
            );
            return Ok(Admission::Denied { retry_after });
        }

        Ok(Admission::Allowed)
    }

    /// Record token spend against today's budget.
    ///
    /// Overrunning the budget logs a warning for operational monitoring;
    /// it does not fail or block the request.
    pub async fn record_spend(&self, usage: TokenUsage) -> Result<()> {
        self.record_spend_at(usage, Utc::now()).await
    }

    /// Spend recording at an explicit instant.
    pub async fn record_spend_at(&self, usage: TokenUsage, now: DateTime<Utc>) -> Result<()> {
        let total = self.store.add_spend(now.date_naive(), usage.total()).await?;
        if total > self.config.daily_token_budget {
            warn!(
                spent = total,
                budget = self.config.daily_token_budget,
                "daily token budget exceeded"
            );
        }
        Ok(())
    }

    /// Tokens remaining in today's budget. Negative once overrun.
    pub async fn remaining_daily_budget(&self) -> Result<i64> {
        self.remaining_daily_budget_at(Utc::now()).await
    }

    /// Remaining budget at an explicit instant.
    pub async fn remaining_daily_budget_at(&self, now: DateTime<Utc>) -> Result<i64> {
        let spent = self.store.spend(now.date_naive()).await?;
        Ok(self.config.daily_token_budget as i64 - spent as i64)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
