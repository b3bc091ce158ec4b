use std::sync::Arc;

use leasegate_application::{
    AdaptiveRateLimitService, AuthorizationService, RateLimitService, SecurityAdminService,
};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub security_admin_service: SecurityAdminService,
    pub rate_limit_service: RateLimitService,
    pub adaptive_rate_limit_service: AdaptiveRateLimitService,
    pub gateway_shared_secret: Arc<str>,
    pub postgres_pool: PgPool,
    pub redis_client: Option<redis::Client>,
    pub redis_required: bool,
}
