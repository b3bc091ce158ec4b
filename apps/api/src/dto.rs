mod authorization;
mod common;
mod security;

pub use authorization::{AuthorizationCheckRequest, AuthorizationCheckResponse};
pub use common::{HealthDependencyStatus, HealthResponse};
pub use security::{
    AssignRoleRequest, ConditionRequest, CreatePermissionRequest, CreateRoleRequest,
    PermissionResponse, RemoveRoleAssignmentRequest, RiskAssessmentQuery, RiskAssessmentResponse,
    RoleAssignmentQuery, RoleAssignmentResponse, RoleResponse,
};
