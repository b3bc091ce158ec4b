use super::*;

use chrono::Utc;
use leasegate_core::AppError;
use leasegate_domain::AuditAction;

use crate::RoleAssignment;
use crate::security_admin_ports::AssignRoleInput;

impl SecurityAdminService {
    /// Assigns a role to a subject and emits an audit event.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment> {
        self.require_rbac(actor, Action::Update).await?;

        if input.subject.trim().is_empty() {
            return Err(AppError::Validation(
                "assignment subject must not be empty".to_owned(),
            ));
        }
        if input
            .expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
        {
            return Err(AppError::Validation(
                "assignment expiry must be in the future".to_owned(),
            ));
        }

        let assignment = self
            .repository
            .assign_role(actor.tenant_id(), input)
            .await?;
        self.authorization_service
            .invalidate_role(actor.tenant_id(), assignment.role_id.as_str())
            .await;

        self.audit(
            actor,
            AuditAction::SecurityRoleAssigned,
            "rbac_subject_role",
            format!("{}:{}", assignment.subject, assignment.role_id),
            format!(
                "assigned role '{}' to '{}'",
                assignment.role_name, assignment.subject
            ),
        )
        .await?;

        Ok(assignment)
    }

    /// Deactivates a subject's role assignment and emits an audit event.
    pub async fn revoke_role(
        &self,
        actor: &UserIdentity,
        subject: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.require_rbac(actor, Action::Update).await?;

        self.repository
            .revoke_role(actor.tenant_id(), subject, role_id)
            .await?;
        self.authorization_service
            .invalidate_role(actor.tenant_id(), role_id)
            .await;

        self.audit(
            actor,
            AuditAction::SecurityRoleUnassigned,
            "rbac_subject_role",
            format!("{subject}:{role_id}"),
            format!("removed role '{role_id}' from '{subject}'"),
        )
        .await
    }

    /// Returns role assignments, optionally for one subject.
    pub async fn list_role_assignments(
        &self,
        actor: &UserIdentity,
        subject: Option<&str>,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require_rbac(actor, Action::Read).await?;

        let subject = subject.map(str::trim).filter(|value| !value.is_empty());
        self.repository
            .list_role_assignments(actor.tenant_id(), subject)
            .await
    }
}
