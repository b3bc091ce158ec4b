use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, warn};

use leasegate_core::{AppError, AppResult};
use leasegate_domain::{
    MAX_WINDOW_SECONDS, RateLimitDecision, RateLimitPolicy, RateLimitTier, RequestMetadata,
    SecurityEventType,
};

use crate::store_timeout::{DEFAULT_STORE_TIMEOUT, within_store_timeout};
use crate::{SecurityEvent, SecurityEventSink};

use super::ports::{AttemptInfo, RateLimitRepository};

enum TierOutcome {
    UnderLimit,
    Exceeded {
        attempt_count: i32,
        retry_after_seconds: u64,
    },
}

/// Application service for tiered rate limiting.
///
/// Fails open: a tier whose store call errors or times out is skipped. Unless
/// the final tier was evaluated under its maximum, an admitted request carries
/// the fallback decision.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
    event_sink: Option<Arc<dyn SecurityEventSink>>,
    policy: Arc<RateLimitPolicy>,
    store_timeout: Duration,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>, policy: RateLimitPolicy) -> Self {
        Self {
            repository,
            event_sink: None,
            policy: Arc::new(policy),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Forwards tier rejections to a security event sink.
    #[must_use]
    pub fn with_event_sink(mut self, event_sink: Arc<dyn SecurityEventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    /// Overrides the bound applied to each counter increment.
    #[must_use]
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Returns the configured tiers.
    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Records one attempt against every tier in order and decides.
    ///
    /// The first tier over its maximum rejects; later tiers are not
    /// incremented for that request.
    pub async fn check_limit(&self, key: &str, metadata: &RequestMetadata) -> RateLimitDecision {
        let last_index = self.policy.last_index();
        let mut last_tier_under_limit = false;

        for (tier_index, tier) in self.policy.tiers().iter().enumerate() {
            match self.evaluate_tier(tier_index, tier, key).await {
                Ok(TierOutcome::UnderLimit) => last_tier_under_limit = tier_index == last_index,
                Ok(TierOutcome::Exceeded {
                    attempt_count,
                    retry_after_seconds,
                }) => {
                    debug!(
                        key,
                        tier_index,
                        attempt_count,
                        retry_after_seconds,
                        "rate limit exceeded"
                    );
                    self.emit_exceeded(key, metadata, tier_index, tier, attempt_count);
                    return RateLimitDecision::rejected(
                        tier_index,
                        retry_after_seconds,
                        tier.message.clone(),
                    );
                }
                Err(error) => {
                    warn!(
                        key,
                        tier_index,
                        error = %error,
                        "rate limit tier could not be evaluated"
                    );
                }
            }
        }

        if last_tier_under_limit {
            RateLimitDecision::allowed(last_index)
        } else {
            RateLimitDecision::fallback()
        }
    }

    /// Removes expired counters. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        self.repository.cleanup_expired(Utc::now()).await
    }

    async fn evaluate_tier(
        &self,
        tier_index: usize,
        tier: &RateLimitTier,
        key: &str,
    ) -> AppResult<TierOutcome> {
        let tier_key = format!("{tier_index}:{}:{key}", tier.window_seconds);
        let window_seconds = i64::try_from(tier.window_seconds)
            .ok()
            .filter(|_| tier.window_seconds <= MAX_WINDOW_SECONDS)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "rate limit window of {}s is out of range",
                    tier.window_seconds
                ))
            })?;
        let info = within_store_timeout(
            self.store_timeout,
            "rate limit increment",
            self.repository.record_attempt(&tier_key, window_seconds),
        )
        .await?;

        let over_limit = u32::try_from(info.attempt_count)
            .map(|count| count > tier.max_attempts)
            .unwrap_or(false);
        if !over_limit {
            return Ok(TierOutcome::UnderLimit);
        }

        Ok(TierOutcome::Exceeded {
            attempt_count: info.attempt_count,
            retry_after_seconds: retry_after_seconds(&info, Utc::now()),
        })
    }

    fn emit_exceeded(
        &self,
        key: &str,
        metadata: &RequestMetadata,
        tier_index: usize,
        tier: &RateLimitTier,
        attempt_count: i32,
    ) {
        let Some(sink) = self.event_sink.clone() else {
            return;
        };

        let occurred_at = Utc::now();
        let event = SecurityEvent {
            event_type: SecurityEventType::RateLimitExceeded,
            severity: tier.severity,
            details: json!({
                "key": key,
                "endpoint": metadata.endpoint,
                "method": metadata.method,
                "tier_index": tier_index,
                "attempt_count": attempt_count,
                "max_attempts": tier.max_attempts,
                "window_seconds": tier.window_seconds,
                "severity": tier.severity.as_str(),
                "timestamp": occurred_at.to_rfc3339(),
            }),
            occurred_at,
        };

        tokio::spawn(async move {
            if let Err(error) = sink.record(event).await {
                warn!(error = %error, "failed to record rate limit security event");
            }
        });
    }
}

fn retry_after_seconds(info: &AttemptInfo, now: DateTime<Utc>) -> u64 {
    let remaining_ms = (info.expires_at - now).num_milliseconds().max(0);
    let seconds = (remaining_ms + 999) / 1000;
    u64::try_from(seconds).unwrap_or(0).max(1)
}
