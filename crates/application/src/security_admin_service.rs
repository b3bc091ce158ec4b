use std::sync::Arc;

use leasegate_core::{AppResult, UserIdentity};
use leasegate_domain::Action;

use crate::{AuditEvent, AuditRepository, AuthorizationService, PrincipalContext};
use crate::security_admin_ports::SecurityAdminRepository;

mod assignments;
mod permissions;
mod roles;

/// Resource tag guarding every administrative operation.
pub const RBAC_RESOURCE: &str = "rbac";

/// Application service for role, permission and assignment administration.
#[derive(Clone)]
pub struct SecurityAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn SecurityAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn SecurityAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_repository,
        }
    }

    async fn require_rbac(&self, actor: &UserIdentity, action: Action) -> AppResult<()> {
        self.authorization_service
            .require_permission(
                actor.tenant_id(),
                RBAC_RESOURCE,
                &action,
                &PrincipalContext::for_identity(actor),
            )
            .await
    }

    async fn audit(
        &self,
        actor: &UserIdentity,
        action: leasegate_domain::AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.subject().to_owned(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail),
            })
            .await
    }
}
