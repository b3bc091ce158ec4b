use super::*;

use leasegate_core::{AppError, NonEmptyString};
use leasegate_domain::AuditAction;

use crate::security_admin_ports::{CreateRoleInput, RoleDefinition};

impl SecurityAdminService {
    /// Returns tenant roles with their permissions.
    pub async fn list_roles(&self, actor: &UserIdentity) -> AppResult<Vec<RoleDefinition>> {
        self.require_rbac(actor, Action::Read).await?;
        self.repository.list_roles(actor.tenant_id()).await
    }

    /// Creates a custom role and emits an audit event.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.require_rbac(actor, Action::Create).await?;

        let name = NonEmptyString::new(input.name.trim())?;
        let role = self
            .repository
            .create_role(
                actor.tenant_id(),
                CreateRoleInput {
                    name: name.into(),
                    ..input
                },
            )
            .await?;

        self.audit(
            actor,
            AuditAction::SecurityRoleCreated,
            "rbac_role",
            role.role_id.clone(),
            format!("created role '{}'", role.name),
        )
        .await?;

        Ok(role)
    }

    /// Deletes a custom role that no active assignment references.
    pub async fn delete_role(&self, actor: &UserIdentity, role_id: &str) -> AppResult<()> {
        self.require_rbac(actor, Action::Delete).await?;

        let tenant_id = actor.tenant_id();
        let role = self
            .repository
            .find_role(tenant_id, role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        if role.is_system {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be deleted",
                role.name
            )));
        }

        let assignment_count = self
            .repository
            .count_active_assignments(tenant_id, role_id)
            .await?;
        if assignment_count > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' is still assigned to {assignment_count} subject(s)",
                role.name
            )));
        }

        self.repository.delete_role(tenant_id, role_id).await?;
        self.authorization_service
            .invalidate_role(tenant_id, role_id)
            .await;

        self.audit(
            actor,
            AuditAction::SecurityRoleDeleted,
            "rbac_role",
            role_id.to_owned(),
            format!("deleted role '{}'", role.name),
        )
        .await
    }
}
