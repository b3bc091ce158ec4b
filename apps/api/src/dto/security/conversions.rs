use std::str::FromStr;

use chrono::{DateTime, Utc};
use leasegate_application::{
    AssignRoleInput, CreatePermissionInput, CreateRoleInput, RiskAssessment, RoleAssignment,
    RoleDefinition,
};
use leasegate_core::AppError;
use leasegate_domain::{Action, ConditionOperator, Permission, PermissionCondition};
use serde_json::json;

use super::{
    AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest, PermissionResponse,
    RiskAssessmentResponse, RoleAssignmentResponse, RoleResponse,
};

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            permission_id: value.permission_id().to_owned(),
            resource: value.resource().to_owned(),
            action: value.action().as_str().to_owned(),
            description: value.description().map(ToOwned::to_owned),
            conditions: value
                .conditions()
                .iter()
                .map(|condition| {
                    json!({
                        "field": condition.field(),
                        "operator": condition.operator().as_str(),
                        "value": condition.value(),
                    })
                })
                .collect(),
        }
    }
}

impl From<RoleDefinition> for RoleResponse {
    fn from(value: RoleDefinition) -> Self {
        Self {
            role_id: value.role_id,
            name: value.name,
            is_system: value.is_system,
            level: value.level,
            created_at: value.created_at.to_rfc3339(),
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
        }
    }
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            subject: value.subject,
            role_id: value.role_id,
            role_name: value.role_name,
            is_primary: value.is_primary,
            is_active: value.is_active,
            expires_at: value.expires_at.map(|expires_at| expires_at.to_rfc3339()),
            assigned_at: value.assigned_at.to_rfc3339(),
        }
    }
}

impl From<RiskAssessment> for RiskAssessmentResponse {
    fn from(value: RiskAssessment) -> Self {
        let (successful_attempts, failed_attempts, last_activity) = value
            .behavior
            .map(|behavior| {
                (
                    behavior.successful_attempts,
                    behavior.failed_attempts,
                    Some(behavior.last_activity.to_rfc3339()),
                )
            })
            .unwrap_or((0, 0, None));

        Self {
            key: value.key,
            score: value.score,
            preset: value.preset.as_str().to_owned(),
            max_attempts: value.preset.max_attempts(),
            window_seconds: value.preset.window_seconds(),
            successful_attempts,
            failed_attempts,
            last_activity,
        }
    }
}

impl From<CreateRoleRequest> for CreateRoleInput {
    fn from(value: CreateRoleRequest) -> Self {
        Self {
            name: value.name,
            level: value.level,
            permission_ids: value.permission_ids,
        }
    }
}

impl TryFrom<CreatePermissionRequest> for CreatePermissionInput {
    type Error = AppError;

    fn try_from(value: CreatePermissionRequest) -> Result<Self, Self::Error> {
        let conditions = value
            .conditions
            .into_iter()
            .map(|condition| {
                PermissionCondition::new(
                    condition.field,
                    ConditionOperator::from_str(condition.operator.trim())?,
                    condition.value,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            resource: value.resource,
            action: Action::from_transport(value.action.trim())?,
            description: value
                .description
                .map(|description| description.trim().to_owned())
                .filter(|description| !description.is_empty()),
            conditions,
        })
    }
}

impl TryFrom<AssignRoleRequest> for AssignRoleInput {
    type Error = AppError;

    fn try_from(value: AssignRoleRequest) -> Result<Self, Self::Error> {
        let expires_at = value
            .expires_at
            .as_deref()
            .map(str::trim)
            .filter(|expires_at| !expires_at.is_empty())
            .map(|expires_at| {
                DateTime::parse_from_rfc3339(expires_at)
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(|error| {
                        AppError::Validation(format!("invalid expires_at '{expires_at}': {error}"))
                    })
            })
            .transpose()?;

        Ok(Self {
            subject: value.subject,
            role_id: value.role_id,
            is_primary: value.is_primary,
            expires_at,
        })
    }
}
