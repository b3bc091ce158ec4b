use std::sync::Arc;

use leasegate_application::{AuthorizationService, SecurityAdminService, SecurityEventSink};
use leasegate_infrastructure::{
    InMemoryRolePermissionCache, PostgresAuditRepository, PostgresAuthorizationRepository,
    PostgresSecurityAdminRepository, PostgresSecurityEventRepository, TracingSecurityEventSink,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, SecurityEventSinkConfig};

pub(super) struct SecurityServices {
    pub(super) authorization_service: AuthorizationService,
    pub(super) security_admin_service: SecurityAdminService,
}

pub(super) fn build_security_services(pool: &PgPool, config: &ApiConfig) -> SecurityServices {
    let authorization_service =
        AuthorizationService::new(Arc::new(PostgresAuthorizationRepository::new(pool.clone())))
            .with_permission_cache(
                Arc::new(InMemoryRolePermissionCache::new(
                    config.permission_cache_capacity,
                )),
                config.permission_cache_ttl_seconds,
            )
            .with_store_timeout(config.store_timeout);

    let security_admin_service = SecurityAdminService::new(
        authorization_service.clone(),
        Arc::new(PostgresSecurityAdminRepository::new(pool.clone())),
        Arc::new(PostgresAuditRepository::new(pool.clone())),
    );

    SecurityServices {
        authorization_service,
        security_admin_service,
    }
}

pub(super) fn build_security_event_sink(
    pool: &PgPool,
    config: &ApiConfig,
) -> Arc<dyn SecurityEventSink> {
    match config.security_event_sink {
        SecurityEventSinkConfig::Log => Arc::new(TracingSecurityEventSink::new()),
        SecurityEventSinkConfig::Postgres => {
            Arc::new(PostgresSecurityEventRepository::new(pool.clone()))
        }
    }
}
