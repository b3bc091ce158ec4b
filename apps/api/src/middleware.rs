use axum::extract::{Extension, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use leasegate_application::PrincipalContext;
use leasegate_core::{AppError, AppResult, TenantId, UserIdentity};
use leasegate_domain::Action;

use crate::error::ApiResult;
use crate::state::AppState;

mod rate_limit;

pub use rate_limit::rate_limit;

pub const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";
pub const USER_SUBJECT_HEADER: &str = "x-user-subject";
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const ROLE_ID_HEADER: &str = "x-role-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Permission a route group demands from the authenticated caller.
#[derive(Debug, Clone)]
pub struct PermissionRequirement {
    pub resource: &'static str,
    pub action: Action,
}

impl PermissionRequirement {
    pub fn new(resource: &'static str, action: Action) -> Self {
        Self { resource, action }
    }
}

/// Trusts identity headers only when the gateway secret matches.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers(), &state.gateway_shared_secret)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_permission(
    State(state): State<AppState>,
    Extension(requirement): Extension<PermissionRequirement>,
    Extension(identity): Extension<UserIdentity>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    state
        .authorization_service
        .require_permission(
            identity.tenant_id(),
            requirement.resource,
            &requirement.action,
            &PrincipalContext::for_identity(&identity),
        )
        .await?;

    Ok(next.run(request).await)
}

fn identity_from_headers(headers: &HeaderMap, gateway_secret: &str) -> AppResult<UserIdentity> {
    let presented = header_str(headers, GATEWAY_SECRET_HEADER)
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    if !secrets_match(presented, gateway_secret) {
        return Err(AppError::Unauthorized("invalid gateway credentials".to_owned()));
    }

    let subject = header_str(headers, USER_SUBJECT_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("{USER_SUBJECT_HEADER} is required")))?;
    let tenant_id = header_str(headers, TENANT_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("{TENANT_ID_HEADER} is required")))?
        .parse::<TenantId>()
        .map_err(|_| AppError::Unauthorized(format!("{TENANT_ID_HEADER} is not a valid tenant id")))?;

    let identity = UserIdentity::new(
        subject,
        header_str(headers, USER_EMAIL_HEADER).map(ToOwned::to_owned),
        tenant_id,
    );

    Ok(match header_str(headers, ROLE_ID_HEADER) {
        Some(role_id) => identity.with_role_id(canonical_role_id(role_id)),
        None => identity,
    })
}

/// Role identifiers that are UUIDs are rewritten to their lowercase
/// hyphenated form so cache entries and invalidations share one key.
fn canonical_role_id(role_id: &str) -> String {
    uuid::Uuid::parse_str(role_id)
        .map(|role_uuid| role_uuid.to_string())
        .unwrap_or_else(|_| role_id.to_owned())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    if presented.len() != expected.len() {
        return false;
    }

    presented
        .iter()
        .zip(expected)
        .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
        == 0
}
