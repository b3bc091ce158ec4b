//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod adaptive;
mod permission;
mod rate_limit;
mod security;

pub use adaptive::{
    AdaptiveLimitPreset, ClientBehavior, RECENT_ACTIVITY_WINDOW_SECONDS, RISK_SCORE_MAX,
};
pub use permission::{ConditionOperator, Permission, PermissionCondition};
pub use rate_limit::{
    MAX_WINDOW_SECONDS, RateLimitDecision, RateLimitPolicy, RateLimitTier, RequestMetadata,
    Severity, rate_limit_key,
};
pub use security::{Action, AuditAction, SecurityEventType};
