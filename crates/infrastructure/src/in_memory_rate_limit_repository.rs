use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leasegate_application::{AttemptInfo, RateLimitRepository};
use leasegate_core::{AppError, AppResult};
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    attempt_count: i32,
    window_started_at: DateTime<Utc>,
    expires_at: Instant,
}

/// In-memory rate limit counters for single-node deployments and tests.
#[derive(Default)]
pub struct InMemoryRateLimitRepository {
    counters: Mutex<HashMap<String, CounterEntry>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo> {
        let window = u64::try_from(window_seconds)
            .ok()
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                AppError::Validation("window_seconds must be greater than zero".to_owned())
            })?;

        let now = Instant::now();
        let wall_clock = Utc::now();
        let window_expires_at = now.checked_add(window).ok_or_else(|| {
            AppError::Internal(format!("rate limit window of {window_seconds}s overflows"))
        })?;
        let mut counters = self.counters.lock().await;

        let entry = counters
            .entry(key.to_owned())
            .and_modify(|entry| {
                if entry.expires_at <= now {
                    *entry = CounterEntry {
                        attempt_count: 0,
                        window_started_at: wall_clock,
                        expires_at: window_expires_at,
                    };
                }
            })
            .or_insert(CounterEntry {
                attempt_count: 0,
                window_started_at: wall_clock,
                expires_at: window_expires_at,
            });
        entry.attempt_count = entry.attempt_count.saturating_add(1);

        let expires_at = chrono::Duration::from_std(entry.expires_at.saturating_duration_since(now))
            .ok()
            .and_then(|remaining| wall_clock.checked_add_signed(remaining))
            .ok_or_else(|| {
                AppError::Internal(format!("rate limit window of {window_seconds}s overflows"))
            })?;

        Ok(AttemptInfo {
            attempt_count: entry.attempt_count,
            window_started_at: entry.window_started_at,
            expires_at,
        })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;
        let initial = counters.len();
        counters.retain(|_, entry| entry.expires_at > now);
        Ok((initial - counters.len()) as u64)
    }
}
