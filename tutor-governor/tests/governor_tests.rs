//! Admission boundaries, window rollover, and spend tracking.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tutor_core::TokenUsage;
use tutor_governor::{Admission, Governor, GovernorConfig, InMemoryCounterStore, Quota, UsageKind};

fn governor() -> Governor {
    Governor::new(GovernorConfig::default(), Arc::new(InMemoryCounterStore::new()))
}

#[tokio::test]
async fn twenty_first_question_in_the_hour_is_denied() {
    let governor = governor();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

    for i in 0..20 {
        let at = now + chrono::Duration::minutes(i * 2);
        let admission = governor.admit_at(Some("student-1"), UsageKind::Question, at).await.unwrap();
        assert!(admission.is_allowed(), "request {} should be admitted", i + 1);
    }

    let admission = governor
        .admit_at(Some("student-1"), UsageKind::Question, now + chrono::Duration::minutes(41))
        .await
        .unwrap();
    match admission {
        Admission::Denied { retry_after } => assert!(retry_after > Duration::ZERO),
        Admission::Allowed => panic!("21st request within the window must be denied"),
    }
}

#[tokio::test]
async fn nth_request_is_admitted_n_plus_first_is_denied() {
    let config = GovernorConfig {
        question: Quota { limit: 3, window: Duration::from_secs(3600) },
        ..Default::default()
    };
    let governor = Governor::new(config, Arc::new(InMemoryCounterStore::new()));
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

    for _ in 0..3 {
        assert!(governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());
    }
    assert!(!governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());
}

#[tokio::test]
async fn window_rollover_resets_the_count() {
    let config = GovernorConfig {
        question: Quota { limit: 1, window: Duration::from_secs(3600) },
        ..Default::default()
    };
    let governor = Governor::new(config, Arc::new(InMemoryCounterStore::new()));
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

    assert!(governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());
    assert!(!governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());

    let next_window = now + chrono::Duration::seconds(3601);
    assert!(
        governor.admit_at(Some("u"), UsageKind::Question, next_window).await.unwrap().is_allowed()
    );
}

#[tokio::test]
async fn kinds_are_counted_independently() {
    let config = GovernorConfig {
        question: Quota { limit: 1, window: Duration::from_secs(3600) },
        personalization: Quota { limit: 1, window: Duration::from_secs(3600) },
        ..Default::default()
    };
    let governor = Governor::new(config, Arc::new(InMemoryCounterStore::new()));
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

    assert!(governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());
    assert!(
        governor.admit_at(Some("u"), UsageKind::Personalization, now).await.unwrap().is_allowed()
    );
    assert!(!governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());
}

#[tokio::test]
async fn users_are_counted_independently() {
    let config = GovernorConfig {
        question: Quota { limit: 1, window: Duration::from_secs(3600) },
        ..Default::default()
    };
    let governor = Governor::new(config, Arc::new(InMemoryCounterStore::new()));
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

    assert!(governor.admit_at(Some("a"), UsageKind::Question, now).await.unwrap().is_allowed());
    assert!(governor.admit_at(Some("b"), UsageKind::Question, now).await.unwrap().is_allowed());
}

#[tokio::test]
async fn anonymous_callers_share_one_bucket() {
    let config = GovernorConfig {
        question: Quota { limit: 1, window: Duration::from_secs(3600) },
        ..Default::default()
    };
    let governor = Governor::new(config, Arc::new(InMemoryCounterStore::new()));
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

    assert!(governor.admit_at(None, UsageKind::Question, now).await.unwrap().is_allowed());
    // A second anonymous caller lands in the same window.
    assert!(!governor.admit_at(None, UsageKind::Question, now).await.unwrap().is_allowed());
    // Blank user ids are treated as anonymous too.
    assert!(!governor.admit_at(Some("  "), UsageKind::Question, now).await.unwrap().is_allowed());
}

#[tokio::test]
async fn budget_overrun_is_soft_not_a_denial() {
    let config = GovernorConfig { daily_token_budget: 100, ..Default::default() };
    let governor = Governor::new(config, Arc::new(InMemoryCounterStore::new()));
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

    governor
        .record_spend_at(TokenUsage { input_tokens: 80, output_tokens: 50 }, now)
        .await
        .unwrap();

    assert_eq!(governor.remaining_daily_budget_at(now).await.unwrap(), -30);
    // Requests are still admitted after the budget is exhausted.
    assert!(governor.admit_at(Some("u"), UsageKind::Question, now).await.unwrap().is_allowed());
}

#[tokio::test]
async fn spend_resets_on_utc_day_boundary() {
    let governor = governor();
    let today = Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 0).unwrap();
    let tomorrow = Utc.with_ymd_and_hms(2025, 3, 11, 0, 1, 0).unwrap();

    governor
        .record_spend_at(TokenUsage { input_tokens: 500, output_tokens: 0 }, today)
        .await
        .unwrap();

    let budget = governor.config().daily_token_budget as i64;
    assert_eq!(governor.remaining_daily_budget_at(today).await.unwrap(), budget - 500);
    assert_eq!(governor.remaining_daily_budget_at(tomorrow).await.unwrap(), budget);
}
