use std::fmt::{Display, Formatter};
use std::str::FromStr;

use leasegate_core::AppError;
use serde::{Deserialize, Serialize};

/// Action verb a permission grants on a resource.
///
/// The CRUD-style verbs form a closed set. Anything else is carried as
/// [`Action::Custom`] so new verbs can be introduced without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    /// Create a new entity.
    Create,
    /// Read one entity.
    Read,
    /// Update an existing entity.
    Update,
    /// Delete an entity.
    Delete,
    /// List entities.
    List,
    /// Any other lower-case verb, e.g. `approve`.
    Custom(String),
}

impl Action {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Custom(value) => value.as_str(),
        }
    }

    /// Parses a transport value into an action.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            "" => Err(AppError::Validation("action must not be empty".to_owned())),
            other
                if other
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '_') =>
            {
                Ok(Self::Custom(other.to_owned()))
            }
            other => Err(AppError::Validation(format!(
                "action '{other}' may only contain letters, digits and underscores"
            ))),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<Action> for String {
    fn from(value: Action) -> Self {
        value.as_str().to_owned()
    }
}

impl Display for Action {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Stable audit actions emitted by administrative use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    SecurityRoleCreated,
    /// Emitted when a custom role is deleted.
    SecurityRoleDeleted,
    /// Emitted when a permission is added to the catalog.
    SecurityPermissionCreated,
    /// Emitted when a permission is granted to a role.
    SecurityPermissionGranted,
    /// Emitted when a permission is revoked from a role.
    SecurityPermissionRevoked,
    /// Emitted when a role is assigned to a subject.
    SecurityRoleAssigned,
    /// Emitted when a role is removed from a subject.
    SecurityRoleUnassigned,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRoleDeleted => "security.role.deleted",
            Self::SecurityPermissionCreated => "security.permission.created",
            Self::SecurityPermissionGranted => "security.permission.granted",
            Self::SecurityPermissionRevoked => "security.permission.revoked",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityRoleUnassigned => "security.role.unassigned",
        }
    }
}

/// Security event categories forwarded to the security-event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    /// A client exceeded one of the rate-limit tiers.
    RateLimitExceeded,
}

impl SecurityEventType {
    /// Returns a stable storage value for this event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate_limit_exceeded",
        }
    }
}
