use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leasegate_core::{AppResult, TenantId};
use leasegate_domain::{Action, Permission, PermissionCondition};

use crate::RoleAssignment;

/// Role definition returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDefinition {
    /// Stable role identifier.
    pub role_id: String,
    /// Unique role name in tenant scope.
    pub name: String,
    /// Indicates a system-managed role.
    pub is_system: bool,
    /// Optional ordering hint, higher is more privileged.
    pub level: Option<i32>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Effective role grants.
    pub permissions: Vec<Permission>,
}

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name in tenant scope.
    pub name: String,
    /// Optional ordering hint.
    pub level: Option<i32>,
    /// Catalog permissions granted to the new role.
    pub permission_ids: Vec<String>,
}

/// Input payload for adding a permission to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePermissionInput {
    /// Resource tag.
    pub resource: String,
    /// Granted action.
    pub action: Action,
    /// Optional description.
    pub description: Option<String>,
    /// Attribute conditions, all of which must hold.
    pub conditions: Vec<PermissionCondition>,
}

/// Input payload for assigning a role to a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleInput {
    /// Subject receiving the role.
    pub subject: String,
    /// Role to assign.
    pub role_id: String,
    /// Marks the subject's default role, demoting any previous one.
    pub is_primary: bool,
    /// Optional expiry of the assignment.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Repository port for role, permission and assignment administration.
#[async_trait]
pub trait SecurityAdminRepository: Send + Sync {
    /// Lists all tenant roles with effective grants.
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<RoleDefinition>>;

    /// Finds one role by identifier.
    async fn find_role(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> AppResult<Option<RoleDefinition>>;

    /// Creates a role and attaches the listed catalog permissions.
    async fn create_role(
        &self,
        tenant_id: TenantId,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition>;

    /// Counts active assignments that reference a role.
    async fn count_active_assignments(&self, tenant_id: TenantId, role_id: &str)
    -> AppResult<u64>;

    /// Deletes a role together with its grants and inactive assignments.
    async fn delete_role(&self, tenant_id: TenantId, role_id: &str) -> AppResult<()>;

    /// Lists the tenant permission catalog.
    async fn list_permissions(&self, tenant_id: TenantId) -> AppResult<Vec<Permission>>;

    /// Adds a permission to the catalog.
    async fn create_permission(
        &self,
        tenant_id: TenantId,
        input: CreatePermissionInput,
    ) -> AppResult<Permission>;

    /// Grants a catalog permission to a role. Granting twice is a no-op.
    async fn grant_permission(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()>;

    /// Revokes a permission from a role.
    async fn revoke_permission(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()>;

    /// Upserts an assignment. A new primary assignment demotes the previous one.
    async fn assign_role(
        &self,
        tenant_id: TenantId,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment>;

    /// Deactivates a subject's assignment of a role.
    async fn revoke_role(&self, tenant_id: TenantId, subject: &str, role_id: &str)
    -> AppResult<()>;

    /// Lists assignments, optionally restricted to one subject.
    async fn list_role_assignments(
        &self,
        tenant_id: TenantId,
        subject: Option<&str>,
    ) -> AppResult<Vec<RoleAssignment>>;
}
