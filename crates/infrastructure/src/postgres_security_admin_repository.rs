use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use leasegate_application::{
    AssignRoleInput, CreatePermissionInput, CreateRoleInput, RBAC_RESOURCE, RoleAssignment,
    RoleDefinition, SecurityAdminRepository,
};
use leasegate_core::{AppError, AppResult, TenantId};
use leasegate_domain::{Action, Permission};

use crate::postgres_authorization_repository::RoleAssignmentRow;
use crate::postgres_permission_rows::{PermissionRow, parse_row_id};

/// Resource tag guarding the adaptive limiter endpoints.
const SECURITY_RESOURCE: &str = "security";

/// Name of the system role created for a tenant's first administrator.
pub const TENANT_ADMIN_ROLE: &str = "tenant_admin";

/// PostgreSQL-backed repository for role administration.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures the tenant admin system role exists with full RBAC grants and
    /// assigns it to `subject` as the primary role.
    ///
    /// Returns the role identifier.
    pub async fn ensure_tenant_admin(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<String> {
        let mut transaction = begin(&self.pool).await?;

        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO rbac_roles (tenant_id, name, is_system, level)
            VALUES ($1, $2, true, 100)
            ON CONFLICT (tenant_id, name) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(TENANT_ADMIN_ROLE)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to ensure admin role: {error}")))?;

        let grants = [
            Action::Create,
            Action::Read,
            Action::Update,
            Action::Delete,
            Action::List,
        ]
        .into_iter()
        .map(|action| (RBAC_RESOURCE, action))
        .chain([(SECURITY_RESOURCE, Action::Read)]);

        for (resource, action) in grants {
            let permission_id = ensure_catalog_permission(
                &mut transaction,
                tenant_id,
                resource,
                &action,
            )
            .await?;

            sqlx::query(
                r#"
                INSERT INTO rbac_role_permissions (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT (role_id, permission_id) DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to ensure role grant: {error}")))?;
        }

        demote_primary(&mut transaction, tenant_id, subject).await?;
        sqlx::query(
            r#"
            INSERT INTO rbac_subject_roles (tenant_id, subject, role_id, is_primary, is_active)
            VALUES ($1, $2, $3, true, true)
            ON CONFLICT (tenant_id, subject, role_id) DO UPDATE
            SET is_primary = true, is_active = true, expires_at = NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign admin role: {error}")))?;

        commit(transaction).await?;
        Ok(role_id.to_string())
    }

    async fn load_role_permissions(
        &self,
        tenant_id: TenantId,
        role_ids: &[uuid::Uuid],
    ) -> AppResult<HashMap<uuid::Uuid, Vec<Permission>>> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r#"
            SELECT
                role_permissions.role_id,
                permissions.id AS permission_id,
                permissions.resource,
                permissions.action,
                permissions.description,
                permissions.conditions
            FROM rbac_role_permissions AS role_permissions
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = role_permissions.permission_id
            WHERE permissions.tenant_id = $1
                AND role_permissions.role_id = ANY($2)
            ORDER BY permissions.resource, permissions.action
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role grants: {error}")))?;

        let mut grouped: HashMap<uuid::Uuid, Vec<Permission>> = HashMap::new();
        for row in rows {
            let permission = row.permission.into_permission(tenant_id)?;
            grouped.entry(row.role_id).or_default().push(permission);
        }

        Ok(grouped)
    }

    async fn list_role_rows(
        &self,
        tenant_id: TenantId,
        role_id: Option<uuid::Uuid>,
    ) -> AppResult<Vec<RoleDefinition>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id AS role_id, name AS role_name, is_system, level, created_at
            FROM rbac_roles
            WHERE tenant_id = $1
                AND ($2::uuid IS NULL OR id = $2)
            ORDER BY level DESC NULLS LAST, name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        let role_ids = rows.iter().map(|row| row.role_id).collect::<Vec<_>>();
        let mut permissions = self.load_role_permissions(tenant_id, &role_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| RoleDefinition {
                role_id: row.role_id.to_string(),
                name: row.role_name,
                is_system: row.is_system,
                level: row.level,
                created_at: row.created_at,
                permissions: permissions.remove(&row.role_id).unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    is_system: bool,
    level: Option<i32>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RoleGrantRow {
    role_id: uuid::Uuid,
    #[sqlx(flatten)]
    permission: PermissionRow,
}

#[async_trait]
impl SecurityAdminRepository for PostgresSecurityAdminRepository {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<RoleDefinition>> {
        self.list_role_rows(tenant_id, None).await
    }

    async fn find_role(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> AppResult<Option<RoleDefinition>> {
        let Ok(role_uuid) = parse_row_id(role_id, "role") else {
            return Ok(None);
        };

        Ok(self
            .list_role_rows(tenant_id, Some(role_uuid))
            .await?
            .into_iter()
            .next())
    }

    async fn create_role(
        &self,
        tenant_id: TenantId,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        let permission_ids = input
            .permission_ids
            .iter()
            .map(|permission_id| parse_row_id(permission_id, "permission"))
            .collect::<AppResult<Vec<_>>>()?;

        let mut transaction = begin(&self.pool).await?;

        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO rbac_roles (tenant_id, name, is_system, level)
            VALUES ($1, $2, false, $3)
            RETURNING id AS role_id, name AS role_name, is_system, level, created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(input.name.as_str())
        .bind(input.level)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_unique_conflict(error, format!("role '{}' already exists", input.name)))?;

        for permission_id in &permission_ids {
            grant_in_transaction(&mut transaction, tenant_id, row.role_id, *permission_id).await?;
        }

        commit(transaction).await?;

        let mut permissions = self
            .load_role_permissions(tenant_id, &[row.role_id])
            .await?;
        Ok(RoleDefinition {
            role_id: row.role_id.to_string(),
            name: row.role_name,
            is_system: row.is_system,
            level: row.level,
            created_at: row.created_at,
            permissions: permissions.remove(&row.role_id).unwrap_or_default(),
        })
    }

    async fn count_active_assignments(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> AppResult<u64> {
        let role_uuid = parse_row_id(role_id, "role")?;
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM rbac_subject_roles
            WHERE tenant_id = $1
                AND role_id = $2
                AND is_active
                AND (expires_at IS NULL OR expires_at > now())
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_uuid)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count assignments: {error}")))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: &str) -> AppResult<()> {
        let role_uuid = parse_row_id(role_id, "role")?;
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_roles
            WHERE tenant_id = $1
                AND id = $2
                AND NOT is_system
                AND NOT EXISTS (
                    SELECT 1
                    FROM rbac_subject_roles AS subject_roles
                    WHERE subject_roles.role_id = rbac_roles.id
                        AND subject_roles.is_active
                        AND (subject_roles.expires_at IS NULL OR subject_roles.expires_at > now())
                )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_uuid)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is a system role, still assigned, or already deleted"
            )));
        }

        Ok(())
    }

    async fn list_permissions(&self, tenant_id: TenantId) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id AS permission_id, resource, action, description, conditions
            FROM rbac_permissions
            WHERE tenant_id = $1
            ORDER BY resource, action, created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter()
            .map(|row| row.into_permission(tenant_id))
            .collect()
    }

    async fn create_permission(
        &self,
        tenant_id: TenantId,
        input: CreatePermissionInput,
    ) -> AppResult<Permission> {
        let conditions = serde_json::to_value(&input.conditions).map_err(|error| {
            AppError::Internal(format!("failed to encode permission conditions: {error}"))
        })?;

        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            INSERT INTO rbac_permissions (tenant_id, resource, action, description, conditions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id AS permission_id, resource, action, description, conditions
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(input.resource.as_str())
        .bind(input.action.as_str())
        .bind(input.description.as_deref())
        .bind(conditions)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create permission: {error}")))?;

        row.into_permission(tenant_id)
    }

    async fn grant_permission(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()> {
        let role_uuid = parse_row_id(role_id, "role")?;
        let permission_uuid = parse_row_id(permission_id, "permission")?;

        let mut transaction = begin(&self.pool).await?;
        ensure_role_exists(&mut transaction, tenant_id, role_uuid).await?;
        grant_in_transaction(&mut transaction, tenant_id, role_uuid, permission_uuid).await?;
        commit(transaction).await
    }

    async fn revoke_permission(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()> {
        let role_uuid = parse_row_id(role_id, "role")?;
        let permission_uuid = parse_row_id(permission_id, "permission")?;

        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_role_permissions AS role_permissions
            USING rbac_roles AS roles
            WHERE roles.id = role_permissions.role_id
                AND roles.tenant_id = $1
                AND role_permissions.role_id = $2
                AND role_permissions.permission_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_uuid)
        .bind(permission_uuid)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke permission: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' is not granted to role '{role_id}'"
            )));
        }

        Ok(())
    }

    async fn assign_role(
        &self,
        tenant_id: TenantId,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment> {
        let role_uuid = parse_row_id(&input.role_id, "role")?;
        let subject = input.subject.trim();

        let mut transaction = begin(&self.pool).await?;
        ensure_role_exists(&mut transaction, tenant_id, role_uuid).await?;

        if input.is_primary {
            demote_primary(&mut transaction, tenant_id, subject).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO rbac_subject_roles (
                tenant_id, subject, role_id, is_primary, is_active, expires_at
            )
            VALUES ($1, $2, $3, $4, true, $5)
            ON CONFLICT (tenant_id, subject, role_id) DO UPDATE
            SET
                is_primary = EXCLUDED.is_primary,
                is_active = true,
                expires_at = EXCLUDED.expires_at,
                assigned_at = now()
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(role_uuid)
        .bind(input.is_primary)
        .bind(input.expires_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign role: {error}")))?;

        let row = sqlx::query_as::<_, RoleAssignmentRow>(
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
                AND subject_roles.role_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(role_uuid)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load assignment: {error}")))?;

        commit(transaction).await?;
        Ok(row.into())
    }

    async fn revoke_role(
        &self,
        tenant_id: TenantId,
        subject: &str,
        role_id: &str,
    ) -> AppResult<()> {
        let role_uuid = parse_row_id(role_id, "role")?;
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_subject_roles
            SET is_active = false, is_primary = false
            WHERE tenant_id = $1
                AND subject = $2
                AND role_id = $3
                AND is_active
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(role_uuid)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role assignment '{subject}:{role_id}' was not found"
            )));
        }

        Ok(())
    }

    async fn list_role_assignments(
        &self,
        tenant_id: TenantId,
        subject: Option<&str>,
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
                AND ($2::text IS NULL OR subject_roles.subject = $2)
            ORDER BY subject_roles.subject, roles.name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role assignments: {error}")))?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }
}

async fn begin(pool: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

async fn ensure_role_exists(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    role_id: uuid::Uuid,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM rbac_roles WHERE tenant_id = $1 AND id = $2)
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(role_id)
    .fetch_one(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

    if !exists {
        return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
    }

    Ok(())
}

async fn grant_in_transaction(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    role_id: uuid::Uuid,
    permission_id: uuid::Uuid,
) -> AppResult<()> {
    let rows_affected = sqlx::query(
        r#"
        INSERT INTO rbac_role_permissions (role_id, permission_id)
        SELECT $2, permissions.id
        FROM rbac_permissions AS permissions
        WHERE permissions.tenant_id = $1
            AND permissions.id = $3
        ON CONFLICT (role_id, permission_id) DO NOTHING
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(role_id)
    .bind(permission_id)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to grant permission: {error}")))?
    .rows_affected();

    if rows_affected == 0 {
        let granted = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM rbac_role_permissions
                WHERE role_id = $1 AND permission_id = $2
            )
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .fetch_one(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve grant: {error}")))?;

        if !granted {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' does not exist"
            )));
        }
    }

    Ok(())
}

async fn demote_primary(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    subject: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE rbac_subject_roles
        SET is_primary = false
        WHERE tenant_id = $1 AND subject = $2 AND is_primary
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(subject)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to demote primary role: {error}")))?;

    Ok(())
}

async fn ensure_catalog_permission(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    resource: &str,
    action: &Action,
) -> AppResult<uuid::Uuid> {
    let existing = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        SELECT id
        FROM rbac_permissions
        WHERE tenant_id = $1
            AND resource = $2
            AND action = $3
            AND conditions = '[]'::jsonb
        LIMIT 1
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(resource)
    .bind(action.as_str())
    .fetch_optional(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to resolve permission: {error}")))?;

    if let Some(permission_id) = existing {
        return Ok(permission_id);
    }

    sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        INSERT INTO rbac_permissions (tenant_id, resource, action, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(resource)
    .bind(action.as_str())
    .bind(format!("{action} {resource}"))
    .fetch_one(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to create permission: {error}")))
}

fn map_unique_conflict(error: sqlx::Error, message: String) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(message);
    }

    AppError::Internal(format!("database write failed: {error}"))
}

#[cfg(test)]
mod tests;
