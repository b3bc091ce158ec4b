use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use leasegate_core::UserIdentity;

use crate::dto::{
    AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest, PermissionResponse,
    RemoveRoleAssignmentRequest, RiskAssessmentQuery, RiskAssessmentResponse, RoleAssignmentQuery,
    RoleAssignmentResponse, RoleResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod assignments;
mod permissions;
mod rate_limits;
mod roles;

pub use assignments::{assign_role_handler, list_role_assignments_handler, unassign_role_handler};
pub use permissions::{
    create_permission_handler, grant_permission_handler, list_permissions_handler,
    revoke_permission_handler,
};
pub use rate_limits::risk_assessment_handler;
pub use roles::{create_role_handler, delete_role_handler, list_roles_handler};
