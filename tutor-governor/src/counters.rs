//! Counter storage behind the governor.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use tutor_core::Result;

/// The state of one fixed usage window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUsage {
    /// When the current window opened.
    pub window_start: DateTime<Utc>,
    /// Admission attempts counted in the current window.
    pub count: u32,
}

/// Storage for the governor's per-key windows and daily token spend.
///
/// Implementations must support safe concurrent increments; the returned
/// count is the value *after* this increment, so callers can compare it
/// against a limit without a second round trip.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Count one admission attempt for `key` in the window containing `now`.
    ///
    /// If `now` falls past the end of the stored window the window rolls
    /// over (start = `now`, count = 1). Counts never reset retroactively.
    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<WindowUsage>;

    /// Add token spend to a UTC day's accumulator; returns the day's total.
    async fn add_spend(&self, day: NaiveDate, tokens: u64) -> Result<u64>;

    /// The tokens spent so far on a UTC day.
    async fn spend(&self, day: NaiveDate) -> Result<u64>;
}

/// An in-memory [`CounterStore`] backed by `tokio::sync::RwLock` maps.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    windows: RwLock<HashMap<String, WindowUsage>>,
    spend: RwLock<HashMap<NaiveDate, u64>>,
}

impl InMemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<WindowUsage> {
        let mut windows = self.windows.write().await;
        let entry = windows
            .entry(key.to_string())
            .or_insert(WindowUsage { window_start: now, count: 0 });

        let window_end = entry.window_start
            + chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        if now >= window_end {
            entry.window_start = now;
            entry.count = 0;
        }
        entry.count += 1;
        Ok(*entry)
    }

    async fn add_spend(&self, day: NaiveDate, tokens: u64) -> Result<u64> {
        let mut spend = self.spend.write().await;
        let total = spend.entry(day).or_insert(0);
        *total += tokens;
        Ok(*total)
    }

    async fn spend(&self, day: NaiveDate) -> Result<u64> {
        let spend = self.spend.read().await;
        Ok(spend.get(&day).copied().unwrap_or(0))
    }
}
