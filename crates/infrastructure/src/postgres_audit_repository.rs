use async_trait::async_trait;
use sqlx::PgPool;

use leasegate_application::{AuditEvent, AuditRepository};
use leasegate_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                tenant_id,
                subject,
                action,
                resource_type,
                resource_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.tenant_id.as_uuid())
        .bind(event.subject)
        .bind(event.action.as_str())
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use leasegate_application::{AuditEvent, AuditRepository};
    use leasegate_core::TenantId;
    use leasegate_domain::AuditAction;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use super::PostgresAuditRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    #[tokio::test]
    async fn appended_event_is_persisted_with_stable_action() {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = match PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };
        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres audit tests: {error}");
        }

        let tenant_id = TenantId::new();
        let repository = PostgresAuditRepository::new(pool.clone());
        let appended = repository
            .append_event(AuditEvent {
                tenant_id,
                subject: "root".to_owned(),
                action: AuditAction::SecurityPermissionGranted,
                resource_type: "rbac_role_permission".to_owned(),
                resource_id: "role:permission".to_owned(),
                detail: None,
            })
            .await;
        assert!(appended.is_ok());

        let action = sqlx::query_scalar::<_, String>(
            "SELECT action FROM audit_log_entries WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_one(&pool)
        .await;
        assert_eq!(action.ok().as_deref(), Some("security.permission.granted"));
    }
}
