//! Application services and ports.

#![forbid(unsafe_code)]

mod adaptive_rate_limit_service;
mod audit_ports;
mod authorization_ports;
mod authorization_service;
mod rate_limit_service;
mod security_admin_ports;
mod security_admin_service;
mod security_event_ports;
mod store_timeout;

pub use adaptive_rate_limit_service::{
    AdaptiveRateLimitService, ClientBehaviorRepository, RiskAssessment,
};
pub use audit_ports::{AuditEvent, AuditRepository};
pub use authorization_ports::{
    AuthorizationRepository, PrincipalContext, RoleAssignment, RolePermissionCache,
};
pub use authorization_service::{
    AuthorizationService, NOT_AUTHORIZED_MESSAGE, group_permissions_by_role,
};
pub use rate_limit_service::{AttemptInfo, RateLimitRepository, RateLimitService};
pub use security_admin_ports::{
    AssignRoleInput, CreatePermissionInput, CreateRoleInput, RoleDefinition,
    SecurityAdminRepository,
};
pub use security_admin_service::{RBAC_RESOURCE, SecurityAdminService};
pub use security_event_ports::{SecurityEvent, SecurityEventSink};
pub use store_timeout::DEFAULT_STORE_TIMEOUT;
