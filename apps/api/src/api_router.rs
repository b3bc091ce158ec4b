use axum::Router;
use axum::extract::Extension;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, delete, get, post, put};
use leasegate_application::RBAC_RESOURCE;
use leasegate_domain::Action;
use tower_http::trace::TraceLayer;

use crate::middleware::PermissionRequirement;
use crate::state::AppState;
use crate::{handlers, middleware};

/// Resource tag guarding security observability endpoints.
pub const SECURITY_RESOURCE: &str = "security";

pub fn build_router(app_state: AppState) -> Router {
    let authorization_routes = Router::new().route(
        "/api/authorization/check",
        post(handlers::authorization::check_permission_handler),
    );

    let security_routes = Router::new()
        .route(
            "/api/security/roles",
            guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Read,
                get(handlers::security::list_roles_handler),
            )
            .merge(guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Create,
                post(handlers::security::create_role_handler),
            )),
        )
        .route(
            "/api/security/roles/{role_id}",
            guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Delete,
                delete(handlers::security::delete_role_handler),
            ),
        )
        .route(
            "/api/security/roles/{role_id}/permissions/{permission_id}",
            guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Update,
                put(handlers::security::grant_permission_handler)
                    .delete(handlers::security::revoke_permission_handler),
            ),
        )
        .route(
            "/api/security/permissions",
            guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Read,
                get(handlers::security::list_permissions_handler),
            )
            .merge(guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Create,
                post(handlers::security::create_permission_handler),
            )),
        )
        .route(
            "/api/security/role-assignments",
            guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Read,
                get(handlers::security::list_role_assignments_handler),
            )
            .merge(guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Update,
                post(handlers::security::assign_role_handler),
            )),
        )
        .route(
            "/api/security/role-unassignments",
            guarded(
                &app_state,
                RBAC_RESOURCE,
                Action::Update,
                post(handlers::security::unassign_role_handler),
            ),
        )
        .route(
            "/api/security/rate-limits/assessment",
            guarded(
                &app_state,
                SECURITY_RESOURCE,
                Action::Read,
                get(handlers::security::risk_assessment_handler),
            ),
        );

    let protected_routes = authorization_routes
        .merge(security_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn guarded(
    app_state: &AppState,
    resource: &'static str,
    action: Action,
    method_router: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    method_router
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_permission,
        ))
        .layer(Extension(PermissionRequirement::new(resource, action)))
}
