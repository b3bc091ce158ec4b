//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_client_behavior_repository;
mod in_memory_rate_limit_repository;
mod in_memory_role_permission_cache;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_permission_rows;
mod postgres_rate_limit_repository;
mod postgres_security_admin_repository;
mod postgres_security_event_repository;
mod redis_rate_limit_repository;
mod tracing_security_event_sink;

pub use in_memory_client_behavior_repository::{
    DEFAULT_CLIENT_BEHAVIOR_CAPACITY, InMemoryClientBehaviorRepository,
};
pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use in_memory_role_permission_cache::InMemoryRolePermissionCache;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_security_admin_repository::{PostgresSecurityAdminRepository, TENANT_ADMIN_ROLE};
pub use postgres_security_event_repository::PostgresSecurityEventRepository;
pub use redis_rate_limit_repository::RedisRateLimitRepository;
pub use tracing_security_event_sink::TracingSecurityEventSink;
