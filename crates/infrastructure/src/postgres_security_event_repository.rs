use async_trait::async_trait;
use sqlx::PgPool;

use leasegate_application::{SecurityEvent, SecurityEventSink};
use leasegate_core::{AppError, AppResult};

/// PostgreSQL-backed append-only store for security events.
#[derive(Clone)]
pub struct PostgresSecurityEventRepository {
    pool: PgPool,
}

impl PostgresSecurityEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityEventSink for PostgresSecurityEventRepository {
    async fn record(&self, event: SecurityEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events (event_type, severity, details, occurred_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(event.severity.as_str())
        .bind(event.details)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record security event: {error}")))?;

        Ok(())
    }
}
