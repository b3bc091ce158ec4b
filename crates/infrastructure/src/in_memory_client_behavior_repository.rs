use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leasegate_application::ClientBehaviorRepository;
use leasegate_core::AppResult;
use leasegate_domain::ClientBehavior;
use tokio::sync::Mutex;

/// Default number of tracked client keys.
pub const DEFAULT_CLIENT_BEHAVIOR_CAPACITY: usize = 1000;

/// Bounded in-memory tracker of per-key client behavior.
///
/// When full, the least recently active key is dropped to admit a new one.
pub struct InMemoryClientBehaviorRepository {
    entries: Mutex<HashMap<String, ClientBehavior>>,
    capacity: usize,
}

impl InMemoryClientBehaviorRepository {
    /// Creates an empty tracker holding at most `capacity` keys.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryClientBehaviorRepository {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_BEHAVIOR_CAPACITY)
    }
}

#[async_trait]
impl ClientBehaviorRepository for InMemoryClientBehaviorRepository {
    async fn record_outcome(
        &self,
        key: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> AppResult<ClientBehavior> {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let least_recent = entries
                .iter()
                .min_by_key(|(_, behavior)| behavior.last_activity)
                .map(|(key, _)| key.clone());
            if let Some(least_recent) = least_recent {
                entries.remove(&least_recent);
            }
        }

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

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use leasegate_application::ClientBehaviorRepository;

    use super::InMemoryClientBehaviorRepository;

    #[tokio::test]
    async fn least_recently_active_key_is_evicted() {
        let repository = InMemoryClientBehaviorRepository::new(2);
        let now = Utc::now();

        for (key, success, age_seconds) in [("a", true, 30), ("b", true, 60), ("a", false, 10)] {
            let recorded = repository
                .record_outcome(key, success, now - Duration::seconds(age_seconds))
                .await;
            assert!(recorded.is_ok());
        }
        assert!(repository.record_outcome("c", false, now).await.is_ok());

        assert_eq!(repository.entries.lock().await.len(), 2);
        assert_eq!(repository.find_behavior("b").await.ok().flatten(), None);

        let a = repository.find_behavior("a").await.ok().flatten();
        assert_eq!(
            a.map(|behavior| (behavior.successful_attempts, behavior.failed_attempts)),
            Some((1, 1))
        );
        assert!(repository.find_behavior("c").await.ok().flatten().is_some());
    }

    #[tokio::test]
    async fn default_capacity_holds_one_thousand_keys() {
        let repository = InMemoryClientBehaviorRepository::default();
        let now = Utc::now();

        for index in 0..1001 {
            let key = format!("10.0.{}.{}", index / 256, index % 256);
            let recorded = repository
                .record_outcome(&key, true, now + Duration::seconds(index))
                .await;
            assert!(recorded.is_ok());
        }

        assert_eq!(repository.entries.lock().await.len(), 1000);
        assert_eq!(repository.find_behavior("10.0.0.0").await.ok().flatten(), None);
    }
}
