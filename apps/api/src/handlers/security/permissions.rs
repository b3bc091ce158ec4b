use super::*;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .security_admin_service
        .list_permissions(&user)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreatePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    let permission = state
        .security_admin_service
        .create_permission(&user, payload.try_into()?)
        .await?;

    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .grant_permission(&user, role_id.as_str(), permission_id.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .revoke_permission(&user, role_id.as_str(), permission_id.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
