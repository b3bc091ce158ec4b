//! Redis-backed rate limit counters.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use leasegate_application::{AttemptInfo, RateLimitRepository};
use leasegate_core::{AppError, AppResult};
use redis::Script;

// INCR and EXPIRE run in one script so a crash between them cannot leave a
// counter without a TTL.
const RECORD_ATTEMPT_SCRIPT: &str = r#"
local key = KEYS[1]
local window = tonumber(ARGV[1])

local count = redis.call('INCR', key)
local ttl = redis.call('TTL', key)

if ttl < 0 then
  redis.call('EXPIRE', key, window)
  ttl = window
end

return {count, ttl}
"#;

/// Redis implementation of the rate limit repository port.
#[derive(Clone)]
pub struct RedisRateLimitRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRateLimitRepository {
    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }
}

#[async_trait]
impl RateLimitRepository for RedisRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo> {
        if window_seconds <= 0 {
            return Err(AppError::Validation(
                "window_seconds must be greater than zero".to_owned(),
            ));
        }

        let redis_key = self.key_for(key);
        let now = Utc::now();

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        let script = Script::new(RECORD_ATTEMPT_SCRIPT);
        let (attempt_count, ttl_seconds): (i64, i64) = script
            .key(redis_key)
            .arg(window_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to record redis rate limit attempt: {error}"
                ))
            })?;

        let attempt_count = i32::try_from(attempt_count)
            .map_err(|error| AppError::Internal(format!("invalid redis attempt count: {error}")))?;
        let (window_started_at, expires_at) = window_bounds(now, window_seconds, ttl_seconds);

        Ok(AttemptInfo {
            attempt_count,
            window_started_at,
            expires_at,
        })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        // Redis rate limit keys expire automatically via TTL.
        Ok(0)
    }
}

fn window_bounds(
    now: DateTime<Utc>,
    window_seconds: i64,
    ttl_seconds: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let ttl_seconds = ttl_seconds.clamp(0, window_seconds);
    let expires_at = now + Duration::seconds(ttl_seconds);
    (expires_at - Duration::seconds(window_seconds), expires_at)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use leasegate_application::RateLimitRepository;

    use super::{RedisRateLimitRepository, window_bounds};

    #[test]
    fn window_bounds_follow_remaining_ttl() {
        let now = Utc::now();

        let (started, expires) = window_bounds(now, 60, 45);
        assert_eq!(expires, now + Duration::seconds(45));
        assert_eq!(started, now - Duration::seconds(15));

        let (_, clamped) = window_bounds(now, 60, 600);
        assert_eq!(clamped, now + Duration::seconds(60));
    }

    #[tokio::test]
    async fn counts_attempts_within_window() {
        let Ok(redis_url) = std::env::var("REDIS_URL") else {
            return;
        };
        let client = match redis::Client::open(redis_url) {
            Ok(client) => client,
            Err(error) => panic!("invalid REDIS_URL in test: {error}"),
        };

        let repository = RedisRateLimitRepository::new(client, "leasegate_test:rate_limit");
        let key = format!("0:60:{}", uuid::Uuid::new_v4());

        let (first, second) = tokio::join!(
            repository.record_attempt(&key, 60),
            repository.record_attempt(&key, 60)
        );
        let mut counts = [first, second]
            .into_iter()
            .map(|result| result.map(|info| info.attempt_count).unwrap_or_default())
            .collect::<Vec<_>>();
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 2]);
    }
}
