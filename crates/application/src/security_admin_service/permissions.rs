use super::*;

use leasegate_core::NonEmptyString;
use leasegate_domain::{AuditAction, Permission};

use crate::security_admin_ports::CreatePermissionInput;

impl SecurityAdminService {
    /// Returns the tenant permission catalog.
    pub async fn list_permissions(&self, actor: &UserIdentity) -> AppResult<Vec<Permission>> {
        self.require_rbac(actor, Action::Read).await?;
        self.repository.list_permissions(actor.tenant_id()).await
    }

    /// Adds a permission to the catalog.
    pub async fn create_permission(
        &self,
        actor: &UserIdentity,
        input: CreatePermissionInput,
    ) -> AppResult<Permission> {
        self.require_rbac(actor, Action::Create).await?;

        let resource = NonEmptyString::new(input.resource.trim().to_ascii_lowercase())?;
        let permission = self
            .repository
            .create_permission(
                actor.tenant_id(),
                CreatePermissionInput {
                    resource: resource.into(),
                    ..input
                },
            )
            .await?;

        self.audit(
            actor,
            AuditAction::SecurityPermissionCreated,
            "rbac_permission",
            permission.permission_id().to_owned(),
            format!(
                "created permission '{}:{}'",
                permission.resource(),
                permission.action()
            ),
        )
        .await?;

        Ok(permission)
    }

    /// Grants a catalog permission to a role.
    pub async fn grant_permission(
        &self,
        actor: &UserIdentity,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()> {
        self.require_rbac(actor, Action::Update).await?;

        self.repository
            .grant_permission(actor.tenant_id(), role_id, permission_id)
            .await?;
        self.authorization_service
            .invalidate_role(actor.tenant_id(), role_id)
            .await;

        self.audit(
            actor,
            AuditAction::SecurityPermissionGranted,
            "rbac_role_permission",
            format!("{role_id}:{permission_id}"),
            format!("granted permission '{permission_id}' to role '{role_id}'"),
        )
        .await
    }

    /// Revokes a permission from a role.
    pub async fn revoke_permission(
        &self,
        actor: &UserIdentity,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()> {
        self.require_rbac(actor, Action::Update).await?;

        self.repository
            .revoke_permission(actor.tenant_id(), role_id, permission_id)
            .await?;
        self.authorization_service
            .invalidate_role(actor.tenant_id(), role_id)
            .await;

        self.audit(
            actor,
            AuditAction::SecurityPermissionRevoked,
            "rbac_role_permission",
            format!("{role_id}:{permission_id}"),
            format!("revoked permission '{permission_id}' from role '{role_id}'"),
        )
        .await
    }
}
