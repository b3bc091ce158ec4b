use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use leasegate_core::{AppResult, TenantId, UserIdentity};
use leasegate_domain::Permission;

/// Assignment linking a subject to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Subject identifier.
    pub subject: String,
    /// Role identifier.
    pub role_id: String,
    /// Role name.
    pub role_name: String,
    /// Marks the subject's default role.
    pub is_primary: bool,
    /// Inactive assignments are kept for history but never count.
    pub is_active: bool,
    /// Optional instant after which the assignment stops counting.
    pub expires_at: Option<DateTime<Utc>>,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Returns whether the assignment grants its role at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Caller-side inputs for one permission check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrincipalContext {
    /// Subject whose assignments are resolved when no role is supplied.
    pub subject: String,
    /// Role already resolved by the caller, e.g. from a token claim.
    pub role_id: Option<String>,
    /// Attributes of the target entity for conditional permissions.
    pub entity: Option<Map<String, Value>>,
}

impl PrincipalContext {
    /// Builds a context from an authenticated identity.
    #[must_use]
    pub fn for_identity(identity: &UserIdentity) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            role_id: identity.role_id().map(ToOwned::to_owned),
            entity: None,
        }
    }

    /// Builds a context for a single pre-resolved role.
    #[must_use]
    pub fn for_role(role_id: impl Into<String>) -> Self {
        Self {
            subject: String::new(),
            role_id: Some(role_id.into()),
            entity: None,
        }
    }

    /// Attaches target entity attributes.
    #[must_use]
    pub fn with_entity(mut self, entity: Map<String, Value>) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Repository port for role and permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists every role assignment of a subject, including inactive ones.
    async fn list_role_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Loads permission sets for several roles in one round trip.
    ///
    /// Roles without grants may be absent from the returned map.
    async fn list_permissions_for_roles(
        &self,
        tenant_id: TenantId,
        role_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<Permission>>>;
}

/// Cache port for per-role permission sets.
#[async_trait]
pub trait RolePermissionCache: Send + Sync {
    /// Returns cached permissions for a role when present and fresh.
    async fn get_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
    ) -> AppResult<Option<Vec<Permission>>>;

    /// Stores permissions for a role with a TTL in seconds.
    async fn set_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: &str,
        permissions: Vec<Permission>,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops any cached entry for a role.
    async fn invalidate_role(&self, tenant_id: TenantId, role_id: &str) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::RoleAssignment;

    fn assignment() -> RoleAssignment {
        RoleAssignment {
            subject: "alice".to_owned(),
            role_id: "role-1".to_owned(),
            role_name: "landlord".to_owned(),
            is_primary: true,
            is_active: true,
            expires_at: None,
            assigned_at: Utc::now(),
        }
    }

    #[test]
    fn assignment_without_expiry_is_effective() {
        assert!(assignment().is_effective_at(Utc::now()));
    }

    #[test]
    fn expired_or_inactive_assignment_is_not_effective() {
        let now = Utc::now();

        let mut expired = assignment();
        expired.expires_at = Some(now - Duration::seconds(1));
        assert!(!expired.is_effective_at(now));

        let mut inactive = assignment();
        inactive.is_active = false;
        assert!(!inactive.is_effective_at(now));

        let mut future = assignment();
        future.expires_at = Some(now + Duration::days(1));
        assert!(future.is_effective_at(now));
    }
}
