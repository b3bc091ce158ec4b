use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use leasegate_core::{AppError, AppResult, TenantId};
use leasegate_domain::{Action, Permission};

use crate::store_timeout::{DEFAULT_STORE_TIMEOUT, within_store_timeout};
use crate::{AuthorizationRepository, PrincipalContext, RolePermissionCache};

/// Message returned for every denial, regardless of which check failed.
pub const NOT_AUTHORIZED_MESSAGE: &str = "not authorized";

/// Application service for tenant-scoped permission checks.
///
/// Resolution fails closed: store errors and timeouts surface as
/// [`AppError::Internal`] and never grant access.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
    permission_cache: Option<Arc<dyn RolePermissionCache>>,
    permission_cache_ttl_seconds: u32,
    store_timeout: Duration,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self {
            repository,
            permission_cache: None,
            permission_cache_ttl_seconds: 0,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Enables per-role permission caching.
    ///
    /// Revocations made by other instances become visible within
    /// `ttl_seconds` at worst. A TTL of zero disables caching.
    #[must_use]
    pub fn with_permission_cache(
        mut self,
        cache: Arc<dyn RolePermissionCache>,
        ttl_seconds: u32,
    ) -> Self {
        self.permission_cache = (ttl_seconds > 0).then_some(cache);
        self.permission_cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Overrides the bound applied to each store call.
    #[must_use]
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Returns whether the principal may perform `action` on `resource`.
    ///
    /// A principal without an effective role is denied.
    pub async fn can(
        &self,
        tenant_id: TenantId,
        resource: &str,
        action: &Action,
        principal: &PrincipalContext,
    ) -> AppResult<bool> {
        let role_ids = self.resolve_role_ids(tenant_id, principal).await?;
        if role_ids.is_empty() {
            debug!(
                tenant_id = %tenant_id,
                subject = %principal.subject,
                "permission check denied: no effective role"
            );
            return Ok(false);
        }

        let permissions = self.load_permissions(tenant_id, &role_ids).await?;
        let allowed = permissions
            .iter()
            .any(|permission| permission.grants(resource, action, principal.entity.as_ref()));

        debug!(
            tenant_id = %tenant_id,
            subject = %principal.subject,
            resource,
            action = %action,
            allowed,
            "permission check evaluated"
        );

        Ok(allowed)
    }

    /// Ensures the principal may perform `action` on `resource`.
    pub async fn require_permission(
        &self,
        tenant_id: TenantId,
        resource: &str,
        action: &Action,
        principal: &PrincipalContext,
    ) -> AppResult<()> {
        if self.can(tenant_id, resource, action, principal).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(NOT_AUTHORIZED_MESSAGE.to_owned()))
    }

    /// Drops cached permissions of a role after a grant or assignment change.
    pub async fn invalidate_role(&self, tenant_id: TenantId, role_id: &str) {
        let Some(cache) = &self.permission_cache else {
            return;
        };

        if let Err(error) = cache.invalidate_role(tenant_id, role_id).await {
            warn!(
                tenant_id = %tenant_id,
                role_id,
                error = %error,
                "failed to invalidate cached role permissions"
            );
        }
    }

    async fn resolve_role_ids(
        &self,
        tenant_id: TenantId,
        principal: &PrincipalContext,
    ) -> AppResult<Vec<String>> {
        if let Some(role_id) = principal
            .role_id
            .as_deref()
            .map(str::trim)
            .filter(|role_id| !role_id.is_empty())
        {
            return Ok(vec![role_id.to_owned()]);
        }

        if principal.subject.trim().is_empty() {
            return Ok(Vec::new());
        }

        let assignments = within_store_timeout(
            self.store_timeout,
            "role assignment lookup",
            self.repository
                .list_role_assignments_for_subject(tenant_id, principal.subject.as_str()),
        )
        .await?;

        let now = Utc::now();
        let role_ids = assignments
            .into_iter()
            .filter(|assignment| assignment.is_effective_at(now))
            .map(|assignment| assignment.role_id)
            .collect::<BTreeSet<_>>();

        Ok(role_ids.into_iter().collect())
    }

    async fn load_permissions(
        &self,
        tenant_id: TenantId,
        role_ids: &[String],
    ) -> AppResult<Vec<Permission>> {
        let mut permissions = Vec::new();
        let mut missing_role_ids = Vec::new();

        for role_id in role_ids {
            match self.cached_role_permissions(tenant_id, role_id).await {
                Some(cached) => permissions.extend(cached),
                None => missing_role_ids.push(role_id.clone()),
            }
        }

        if missing_role_ids.is_empty() {
            return Ok(permissions);
        }

        let mut fetched = within_store_timeout(
            self.store_timeout,
            "role permission lookup",
            self.repository
                .list_permissions_for_roles(tenant_id, &missing_role_ids),
        )
        .await?;

        for role_id in missing_role_ids {
            let role_permissions = fetched.remove(&role_id).unwrap_or_default();
            self.store_role_permissions(tenant_id, role_id.as_str(), &role_permissions)
                .await;
            permissions.extend(role_permissions);
        }

        Ok(permissions)
    }

    async fn cached_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> Option<Vec<Permission>> {
        let cache = self.permission_cache.as_ref()?;
        match cache.get_role_permissions(tenant_id, role_id).await {
            Ok(cached) => cached,
            Err(error) => {
                warn!(
                    tenant_id = %tenant_id,
                    role_id,
                    error = %error,
                    "role permission cache read failed, falling back to store"
                );
                None
            }
        }
    }

    async fn store_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permissions: &[Permission],
    ) {
        let Some(cache) = &self.permission_cache else {
            return;
        };

        if let Err(error) = cache
            .set_role_permissions(
                tenant_id,
                role_id,
                permissions.to_vec(),
                self.permission_cache_ttl_seconds,
            )
            .await
        {
            warn!(
                tenant_id = %tenant_id,
                role_id,
                error = %error,
                "failed to populate role permission cache"
            );
        }
    }
}

/// Groups flat `(role_id, permission)` rows into the batch lookup shape.
#[must_use]
pub fn group_permissions_by_role(
    rows: impl IntoIterator<Item = (String, Permission)>,
) -> HashMap<String, Vec<Permission>> {
    let mut grouped: HashMap<String, Vec<Permission>> = HashMap::new();
    for (role_id, permission) in rows {
        grouped.entry(role_id).or_default().push(permission);
    }

    grouped
}

#[cfg(test)]
mod tests;
