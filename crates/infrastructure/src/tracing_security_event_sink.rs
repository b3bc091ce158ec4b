use async_trait::async_trait;
use leasegate_application::{SecurityEvent, SecurityEventSink};
use leasegate_core::AppResult;
use leasegate_domain::Severity;
use tracing::{info, warn};

/// Security event sink that writes structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSecurityEventSink;

impl TracingSecurityEventSink {
    /// Creates a log-backed sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecurityEventSink for TracingSecurityEventSink {
    async fn record(&self, event: SecurityEvent) -> AppResult<()> {
        match event.severity {
            Severity::High | Severity::Critical => warn!(
                event_type = event.event_type.as_str(),
                severity = event.severity.as_str(),
                occurred_at = %event.occurred_at,
                details = %event.details,
                "security event"
            ),
            Severity::Low | Severity::Medium => info!(
                event_type = event.event_type.as_str(),
                severity = event.severity.as_str(),
                occurred_at = %event.occurred_at,
                details = %event.details,
                "security event"
            ),
        }

        Ok(())
    }
}
