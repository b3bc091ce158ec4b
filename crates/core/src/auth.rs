use serde::{Deserialize, Serialize};

use crate::TenantId;

/// Principal identity asserted by the upstream authentication gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    email: Option<String>,
    tenant_id: TenantId,
    role_id: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from authentication and tenancy data.
    #[must_use]
    pub fn new(subject: impl Into<String>, email: Option<String>, tenant_id: TenantId) -> Self {
        Self {
            subject: subject.into(),
            email,
            tenant_id,
            role_id: None,
        }
    }

    /// Attaches a role already resolved from the caller's token claims.
    #[must_use]
    pub fn with_role_id(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the email, if the gateway forwarded one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the pre-resolved role, if the token carried one.
    #[must_use]
    pub fn role_id(&self) -> Option<&str> {
        self.role_id.as_deref()
    }
}
