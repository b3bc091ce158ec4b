//! PostgreSQL-backed rate limit counters in the `rate_limit_counters` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leasegate_application::{AttemptInfo, RateLimitRepository};
use leasegate_core::{AppError, AppResult};

/// PostgreSQL implementation of the rate limit repository port.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo> {
        if window_seconds <= 0 {
            return Err(AppError::Validation(
                "window_seconds must be greater than zero".to_owned(),
            ));
        }

        // The row lock taken by the upsert serializes concurrent increments.
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO rate_limit_counters (key, attempt_count, window_started_at, expires_at)
            VALUES ($1, 1, now(), now() + make_interval(secs => $2::float8))
            ON CONFLICT (key) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN rate_limit_counters.expires_at <= now()
                    THEN 1
                    ELSE rate_limit_counters.attempt_count + 1
                END,
                window_started_at = CASE
                    WHEN rate_limit_counters.expires_at <= now()
                    THEN now()
                    ELSE rate_limit_counters.window_started_at
                END,
                expires_at = CASE
                    WHEN rate_limit_counters.expires_at <= now()
                    THEN EXCLUDED.expires_at
                    ELSE rate_limit_counters.expires_at
                END
            RETURNING attempt_count, window_started_at, expires_at
            "#,
        )
        .bind(key)
        .bind(window_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record rate limit attempt: {error}"))
        })?;

        Ok(AttemptInfo {
            attempt_count: row.attempt_count,
            window_started_at: row.window_started_at,
            expires_at: row.expires_at,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM rate_limit_counters
            WHERE expires_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to cleanup expired rate limits: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    attempt_count: i32,
    window_started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use leasegate_application::RateLimitRepository;

    use super::PostgresRateLimitRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres rate limit tests: {error}");
        }

        Some(pool)
    }

    #[tokio::test]
    async fn concurrent_first_attempts_are_both_counted() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let repository = PostgresRateLimitRepository::new(pool);
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

        let third = repository.record_attempt(&key, 60).await;
        let Ok(third) = third else {
            panic!("third attempt failed");
        };
        assert_eq!(third.attempt_count, 3);
        assert!(third.expires_at > Utc::now());
        assert!(third.expires_at <= third.window_started_at + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn expired_window_restarts_counter() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let repository = PostgresRateLimitRepository::new(pool.clone());
        let key = format!("0:60:{}", uuid::Uuid::new_v4());
        assert!(repository.record_attempt(&key, 60).await.is_ok());
        assert!(repository.record_attempt(&key, 60).await.is_ok());

        let expired = sqlx::query(
            "UPDATE rate_limit_counters SET expires_at = now() - interval '1 second' WHERE key = $1",
        )
        .bind(&key)
        .execute(&pool)
        .await;
        assert!(expired.is_ok());

        let restarted = repository.record_attempt(&key, 60).await;
        assert_eq!(restarted.map(|info| info.attempt_count).ok(), Some(1));
    }
}
