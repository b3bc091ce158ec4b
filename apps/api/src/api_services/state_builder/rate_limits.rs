use std::sync::Arc;

use leasegate_application::{
    AdaptiveRateLimitService, RateLimitRepository, RateLimitService, SecurityEventSink,
};
use leasegate_core::{AppError, AppResult};
use leasegate_infrastructure::{
    InMemoryClientBehaviorRepository, InMemoryRateLimitRepository, PostgresRateLimitRepository,
    RedisRateLimitRepository,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, RateLimitStoreConfig};

pub(super) fn build_rate_limit_service(
    pool: &PgPool,
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
    security_event_sink: Arc<dyn SecurityEventSink>,
) -> AppResult<RateLimitService> {
    let rate_limit_repository: Arc<dyn RateLimitRepository> = match config.rate_limit_store {
        RateLimitStoreConfig::Postgres => Arc::new(PostgresRateLimitRepository::new(pool.clone())),
        RateLimitStoreConfig::Redis => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned())
            })?;
            Arc::new(RedisRateLimitRepository::new(
                redis_client,
                "leasegate:rate_limit",
            ))
        }
        RateLimitStoreConfig::Memory => Arc::new(InMemoryRateLimitRepository::new()),
    };

    Ok(
        RateLimitService::new(rate_limit_repository, config.rate_limit_policy.clone())
            .with_event_sink(security_event_sink)
            .with_store_timeout(config.store_timeout),
    )
}

pub(super) fn build_adaptive_rate_limit_service(config: &ApiConfig) -> AdaptiveRateLimitService {
    AdaptiveRateLimitService::new(Arc::new(InMemoryClientBehaviorRepository::new(
        config.adaptive_tracker_capacity,
    )))
}
