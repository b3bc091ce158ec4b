use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use leasegate_core::AppResult;
use leasegate_domain::{SecurityEventType, Severity};

/// Security-relevant occurrence forwarded to monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityEvent {
    /// Event category.
    pub event_type: SecurityEventType,
    /// Severity of the event.
    pub severity: Severity,
    /// Structured event details.
    pub details: Value,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}

/// Sink port for security events.
///
/// Callers never let a sink failure change a request outcome.
#[async_trait]
pub trait SecurityEventSink: Send + Sync {
    /// Records one security event.
    async fn record(&self, event: SecurityEvent) -> AppResult<()>;
}
