use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

mod conversions;

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub permission_ids: Vec<String>,
}

/// Attribute condition attached to a permission.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/condition-request.ts"
)]
pub struct ConditionRequest {
    pub field: String,
    pub operator: String,
    #[ts(type = "unknown")]
    pub value: Value,
}

/// Incoming payload for a permission catalog entry.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-permission-request.ts"
)]
pub struct CreatePermissionRequest {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionRequest>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub subject: String,
    pub role_id: String,
    #[serde(default)]
    pub is_primary: bool,
    /// RFC 3339 timestamp after which the assignment stops counting.
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Incoming payload for role unassignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/remove-role-assignment-request.ts"
)]
pub struct RemoveRoleAssignmentRequest {
    pub subject: String,
    pub role_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleAssignmentQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RiskAssessmentQuery {
    pub identity: Option<String>,
    pub address: String,
}

/// API representation of a permission.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    #[ts(type = "Array<{ field: string, operator: string, value: unknown }>")]
    pub conditions: Vec<Value>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub is_system: bool,
    pub level: Option<i32>,
    pub created_at: String,
    pub permissions: Vec<PermissionResponse>,
}

/// API representation of a role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub subject: String,
    pub role_id: String,
    pub role_name: String,
    pub is_primary: bool,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub assigned_at: String,
}

/// Advisory limiter sizing for one client.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/risk-assessment-response.ts"
)]
pub struct RiskAssessmentResponse {
    pub key: String,
    pub score: u8,
    pub preset: String,
    pub max_attempts: u32,
    pub window_seconds: u64,
    pub successful_attempts: u32,
    pub failed_attempts: u32,
    pub last_activity: Option<String>,
}
