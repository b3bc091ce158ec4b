use axum::Json;
use axum::extract::{Extension, State};
use leasegate_application::PrincipalContext;
use leasegate_core::UserIdentity;
use leasegate_domain::Action;

use crate::dto::{AuthorizationCheckRequest, AuthorizationCheckResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Answers whether the caller may perform an action on a resource.
pub async fn check_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<AuthorizationCheckRequest>,
) -> ApiResult<Json<AuthorizationCheckResponse>> {
    let action = Action::from_transport(payload.action.as_str())?;
    let principal = match payload.entity {
        Some(entity) => PrincipalContext::for_identity(&user).with_entity(entity),
        None => PrincipalContext::for_identity(&user),
    };

    let allowed = state
        .authorization_service
        .can(
            user.tenant_id(),
            payload.resource.trim(),
            &action,
            &principal,
        )
        .await?;

    Ok(Json(AuthorizationCheckResponse { allowed }))
}
