use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leasegate_core::AppResult;

/// Repository port for rate limit counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the given key.
    ///
    /// Increments atomically. When the current window has expired the counter
    /// restarts at one. Returns the count within the active window.
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo>;

    /// Removes counters whose window ended before the cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Information about the current rate limit window for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Number of attempts in the current window (including this one).
    pub attempt_count: i32,
    /// When the current window started.
    pub window_started_at: DateTime<Utc>,
    /// When the current window ends.
    pub expires_at: DateTime<Utc>,
}
