use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use leasegate_application::{AuthorizationRepository, RoleAssignment, group_permissions_by_role};
use leasegate_core::{AppError, AppResult, TenantId};
use leasegate_domain::Permission;

use crate::postgres_permission_rows::PermissionRow;

/// PostgreSQL-backed repository for role and permission lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RoleAssignmentRow {
    pub(crate) subject: String,
    pub(crate) role_id: uuid::Uuid,
    pub(crate) role_name: String,
    pub(crate) is_primary: bool,
    pub(crate) is_active: bool,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) assigned_at: DateTime<Utc>,
}

impl From<RoleAssignmentRow> for RoleAssignment {
    fn from(row: RoleAssignmentRow) -> Self {
        Self {
            subject: row.subject,
            role_id: row.role_id.to_string(),
            role_name: row.role_name,
            is_primary: row.is_primary,
            is_active: row.is_active,
            expires_at: row.expires_at,
            assigned_at: row.assigned_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: uuid::Uuid,
    #[sqlx(flatten)]
    permission: PermissionRow,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_role_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT
                subject_roles.subject,
                subject_roles.role_id,
                roles.name AS role_name,
                subject_roles.is_primary,
                subject_roles.is_active,
                subject_roles.expires_at,
                subject_roles.assigned_at
            FROM rbac_subject_roles AS subject_roles
            INNER JOIN rbac_roles AS roles
                ON roles.id = subject_roles.role_id
            WHERE subject_roles.tenant_id = $1
                AND subject_roles.subject = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role assignments: {error}"))
        })?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn list_permissions_for_roles(
        &self,
        tenant_id: TenantId,
        role_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<Permission>>> {
        // Unknown or malformed identifiers simply have no grants. Results are
        // keyed by the identifier as the caller spelled it.
        let requested = role_ids
            .iter()
            .filter_map(|role_id| {
                uuid::Uuid::parse_str(role_id.trim())
                    .ok()
                    .map(|role_uuid| (role_uuid, role_id.clone()))
            })
            .collect::<HashMap<_, _>>();
        let role_uuids = requested.keys().copied().collect::<Vec<_>>();
        if role_uuids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                role_permissions.role_id,
                permissions.id AS permission_id,
                permissions.resource,
                permissions.action,
                permissions.description,
                permissions.conditions
            FROM rbac_role_permissions AS role_permissions
            INNER JOIN rbac_roles AS roles
                ON roles.id = role_permissions.role_id
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = role_permissions.permission_id
            WHERE roles.tenant_id = $1
                AND role_permissions.role_id = ANY($2)
            ORDER BY role_permissions.role_id, permissions.resource, permissions.action
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permissions: {error}")))?;

        let rows = rows
            .into_iter()
            .map(|row| {
                let permission = row.permission.into_permission(tenant_id)?;
                let role_id = requested
                    .get(&row.role_id)
                    .cloned()
                    .unwrap_or_else(|| row.role_id.to_string());
                Ok((role_id, permission))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(group_permissions_by_role(rows))
    }
}
