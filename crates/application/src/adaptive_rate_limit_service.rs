//! Advisory risk assessment from recent client behavior.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use leasegate_core::{AppError, AppResult};
use leasegate_domain::{AdaptiveLimitPreset, ClientBehavior};

/// Store port for per-key behavior counters.
#[async_trait]
pub trait ClientBehaviorRepository: Send + Sync {
    /// Records one outcome and returns the updated counters.
    async fn record_outcome(
        &self,
        key: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> AppResult<ClientBehavior>;

    /// Returns the counters tracked for a key.
    async fn find_behavior(&self, key: &str) -> AppResult<Option<ClientBehavior>>;
}

/// Risk score and suggested limiter sizing for one client key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Client key the assessment refers to.
    pub key: String,
    /// Score from 0 to 100.
    pub score: u8,
    /// Suggested preset for the score.
    pub preset: AdaptiveLimitPreset,
    /// Tracked counters, absent for unseen clients.
    pub behavior: Option<ClientBehavior>,
}

/// Application service for adaptive limit advice.
#[derive(Clone)]
pub struct AdaptiveRateLimitService {
    repository: Arc<dyn ClientBehaviorRepository>,
}

impl AdaptiveRateLimitService {
    /// Creates a new adaptive service.
    #[must_use]
    pub fn new(repository: Arc<dyn ClientBehaviorRepository>) -> Self {
        Self { repository }
    }

    /// Records the outcome of one request for a client key.
    pub async fn record_outcome(&self, key: &str, success: bool) -> AppResult<()> {
        if key.trim().is_empty() {
            return Err(AppError::Validation(
                "client key must not be empty".to_owned(),
            ));
        }

        let behavior = self
            .repository
            .record_outcome(key, success, Utc::now())
            .await?;
        debug!(
            key,
            success,
            successful_attempts = behavior.successful_attempts,
            failed_attempts = behavior.failed_attempts,
            "client outcome recorded"
        );

        Ok(())
    }

    /// Scores a client key and maps the score to a preset.
    pub async fn assess(&self, key: &str) -> AppResult<RiskAssessment> {
        let behavior = self.repository.find_behavior(key).await?;
        let score = behavior
            .map(|behavior| behavior.risk_score(Utc::now()))
            .unwrap_or_default();

        Ok(RiskAssessment {
            key: key.to_owned(),
            score,
            preset: AdaptiveLimitPreset::for_risk_score(score),
            behavior,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex;

    use leasegate_core::{AppError, AppResult};
    use leasegate_domain::{AdaptiveLimitPreset, ClientBehavior};

    use super::{AdaptiveRateLimitService, ClientBehaviorRepository};

    #[derive(Default)]
    struct FakeClientBehaviorRepository {
        entries: Mutex<HashMap<String, ClientBehavior>>,
    }

    #[async_trait]
    impl ClientBehaviorRepository for FakeClientBehaviorRepository {
        async fn record_outcome(
            &self,
            key: &str,
            success: bool,
            now: DateTime<Utc>,
        ) -> AppResult<ClientBehavior> {
            let mut entries = self.entries.lock().await;
            let behavior = entries
                .entry(key.to_owned())
                .or_insert_with(|| ClientBehavior::new(now));
            behavior.record(success, now);
            Ok(*behavior)
        }

        async fn find_behavior(&self, key: &str) -> AppResult<Option<ClientBehavior>> {
            Ok(self.entries.lock().await.get(key).copied())
        }
    }

    fn service() -> AdaptiveRateLimitService {
        AdaptiveRateLimitService::new(Arc::new(FakeClientBehaviorRepository::default()))
    }

    #[tokio::test]
    async fn unseen_client_gets_standard_preset() {
        let assessment = service().assess("10.0.0.1").await;

        let Ok(assessment) = assessment else {
            panic!("assessment failed");
        };
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.preset, AdaptiveLimitPreset::Standard);
        assert_eq!(assessment.behavior, None);
    }

    #[tokio::test]
    async fn repeated_recent_failures_escalate_to_strict() {
        let service = service();
        for _ in 0..4 {
            assert!(service.record_outcome("mallory:10.0.0.66", false).await.is_ok());
        }

        let Ok(assessment) = service.assess("mallory:10.0.0.66").await else {
            panic!("assessment failed");
        };
        assert!(assessment.score >= 55);
        assert_eq!(assessment.preset, AdaptiveLimitPreset::Strict);
        assert_eq!(
            assessment.behavior.map(|behavior| behavior.failed_attempts),
            Some(4)
        );
    }

    #[tokio::test]
    async fn successful_history_lowers_risk() {
        let service = service();
        for _ in 0..6 {
            assert!(service.record_outcome("alice:10.0.0.1", true).await.is_ok());
        }
        assert!(service.record_outcome("alice:10.0.0.1", false).await.is_ok());

        let Ok(assessment) = service.assess("alice:10.0.0.1").await else {
            panic!("assessment failed");
        };
        assert_eq!(assessment.score, 5);
        assert_eq!(assessment.preset, AdaptiveLimitPreset::Standard);
    }

    #[tokio::test]
    async fn blank_key_is_rejected() {
        let result = service().record_outcome("  ", true).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
