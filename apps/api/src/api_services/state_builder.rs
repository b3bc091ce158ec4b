use std::sync::Arc;

use leasegate_core::AppError;
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::redis::build_redis_client;

mod rate_limits;
mod security;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = config
        .redis_url
        .as_deref()
        .map(build_redis_client)
        .transpose()?;

    let security_services = security::build_security_services(&pool, config);
    let security_event_sink = security::build_security_event_sink(&pool, config);
    let rate_limit_service = rate_limits::build_rate_limit_service(
        &pool,
        config,
        redis_client.clone(),
        security_event_sink,
    )?;

    Ok(AppState {
        authorization_service: security_services.authorization_service,
        security_admin_service: security_services.security_admin_service,
        rate_limit_service,
        adaptive_rate_limit_service: rate_limits::build_adaptive_rate_limit_service(config),
        gateway_shared_secret: Arc::from(config.gateway_shared_secret.as_str()),
        postgres_pool: pool,
        redis_client,
        redis_required: config.redis_required(),
    })
}
