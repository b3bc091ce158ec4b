use std::str::FromStr;

use serde_json::Value;
use sqlx::FromRow;

use leasegate_core::{AppError, AppResult, TenantId};
use leasegate_domain::{Action, Permission, PermissionCondition};

/// Permission columns shared by the RBAC queries.
#[derive(Debug, FromRow)]
pub(crate) struct PermissionRow {
    pub(crate) permission_id: uuid::Uuid,
    pub(crate) resource: String,
    pub(crate) action: String,
    pub(crate) description: Option<String>,
    pub(crate) conditions: Value,
}

impl PermissionRow {
    pub(crate) fn into_permission(self, tenant_id: TenantId) -> AppResult<Permission> {
        let action = Action::from_str(self.action.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored action '{}' for tenant '{tenant_id}': {error}",
                self.action
            ))
        })?;
        let conditions =
            serde_json::from_value::<Vec<PermissionCondition>>(self.conditions).map_err(
                |error| {
                    AppError::Internal(format!(
                        "invalid stored conditions for permission '{}': {error}",
                        self.permission_id
                    ))
                },
            )?;

        Permission::new(
            self.permission_id.to_string(),
            self.resource,
            action,
            self.description,
            conditions,
        )
    }
}

/// Parses a path or header identifier into a row key.
pub(crate) fn parse_row_id(value: &str, label: &str) -> AppResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value.trim())
        .map_err(|_| AppError::NotFound(format!("{label} '{value}' does not exist")))
}
