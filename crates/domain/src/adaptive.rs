//! Adaptive limit sizing derived from recent client behavior.
//!
//! Nothing here enforces limits. The risk score only suggests which preset
//! the primary limiter tiers should be sized to.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Activity younger than this many seconds counts as recent.
pub const RECENT_ACTIVITY_WINDOW_SECONDS: i64 = 5 * 60;

/// Upper bound of [`ClientBehavior::risk_score`].
pub const RISK_SCORE_MAX: u8 = 100;

/// Success and failure counters for one identity/address key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBehavior {
    /// Requests that completed successfully.
    pub successful_attempts: u32,
    /// Requests that were rejected or failed authentication/validation.
    pub failed_attempts: u32,
    /// Timestamp of the most recent recorded outcome.
    pub last_activity: DateTime<Utc>,
}

impl ClientBehavior {
    /// Creates an empty behavior record.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            successful_attempts: 0,
            failed_attempts: 0,
            last_activity: now,
        }
    }

    /// Records one request outcome.
    pub fn record(&mut self, success: bool, now: DateTime<Utc>) {
        if success {
            self.successful_attempts = self.successful_attempts.saturating_add(1);
        } else {
            self.failed_attempts = self.failed_attempts.saturating_add(1);
        }
        self.last_activity = now;
    }

    /// Returns failures divided by total attempts, or zero without attempts.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = u64::from(self.successful_attempts) + u64::from(self.failed_attempts);
        if total == 0 {
            return 0.0;
        }

        f64::from(self.failed_attempts) / total as f64
    }

    /// Scores how suspicious the client looks, from 0 to [`RISK_SCORE_MAX`].
    #[must_use]
    pub fn risk_score(&self, now: DateTime<Utc>) -> u8 {
        let mut score: i32 = 0;

        if now - self.last_activity < Duration::seconds(RECENT_ACTIVITY_WINDOW_SECONDS) {
            score += 20;
        }
        if self.failure_rate() > 0.5 {
            score += 30;
        }
        if self.failed_attempts > 3 {
            score += 25;
        }
        if self.successful_attempts > 5 {
            score -= 15;
        }

        u8::try_from(score.clamp(0, i32::from(RISK_SCORE_MAX))).unwrap_or(RISK_SCORE_MAX)
    }
}

/// Suggested limiter sizing for a risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveLimitPreset {
    /// 3 attempts per 15 minutes, for scores above 70.
    Strict,
    /// 5 attempts per 5 minutes, for scores above 40.
    Elevated,
    /// 10 attempts per minute.
    Standard,
}

impl AdaptiveLimitPreset {
    /// Selects the preset for a risk score.
    #[must_use]
    pub fn for_risk_score(score: u8) -> Self {
        match score {
            71.. => Self::Strict,
            41..=70 => Self::Elevated,
            _ => Self::Standard,
        }
    }

    /// Returns the suggested attempts per window.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Strict => 3,
            Self::Elevated => 5,
            Self::Standard => 10,
        }
    }

    /// Returns the suggested window length in seconds.
    #[must_use]
    pub fn window_seconds(&self) -> u64 {
        match self {
            Self::Strict => 15 * 60,
            Self::Elevated => 5 * 60,
            Self::Standard => 60,
        }
    }

    /// Returns a stable storage value for this preset.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Elevated => "elevated",
            Self::Standard => "standard",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use super::{AdaptiveLimitPreset, ClientBehavior, RISK_SCORE_MAX};

    #[test]
    fn recent_repeated_failures_select_strict_preset() {
        let now = Utc::now();
        let mut behavior = ClientBehavior::new(now);
        for _ in 0..4 {
            behavior.record(false, now);
        }

        let score = behavior.risk_score(now);
        assert!(score >= 55);
        assert_eq!(score, 75);
        assert_eq!(
            AdaptiveLimitPreset::for_risk_score(score),
            AdaptiveLimitPreset::Strict
        );
    }

    #[test]
    fn stale_mostly_successful_client_scores_zero() {
        let now = Utc::now();
        let mut behavior = ClientBehavior::new(now - Duration::hours(1));
        for _ in 0..8 {
            behavior.record(true, now - Duration::hours(1));
        }
        behavior.record(false, now - Duration::hours(1));

        assert_eq!(behavior.risk_score(now), 0);
        assert_eq!(
            AdaptiveLimitPreset::for_risk_score(0),
            AdaptiveLimitPreset::Standard
        );
    }

    #[test]
    fn recent_half_failures_stay_in_standard_band() {
        let now = Utc::now();
        let mut behavior = ClientBehavior::new(now);
        behavior.record(true, now);
        behavior.record(false, now);

        assert_eq!(behavior.risk_score(now), 20);
    }

    #[test]
    fn preset_boundaries() {
        assert_eq!(AdaptiveLimitPreset::for_risk_score(70), AdaptiveLimitPreset::Elevated);
        assert_eq!(AdaptiveLimitPreset::for_risk_score(71), AdaptiveLimitPreset::Strict);
        assert_eq!(AdaptiveLimitPreset::for_risk_score(40), AdaptiveLimitPreset::Standard);
        assert_eq!(AdaptiveLimitPreset::for_risk_score(41), AdaptiveLimitPreset::Elevated);
        assert_eq!(AdaptiveLimitPreset::Strict.max_attempts(), 3);
        assert_eq!(AdaptiveLimitPreset::Strict.window_seconds(), 900);
        assert_eq!(AdaptiveLimitPreset::Elevated.window_seconds(), 300);
    }

    proptest! {
        #[test]
        fn risk_score_is_bounded(
            successes in 0u32..10_000,
            failures in 0u32..10_000,
            age_seconds in 0i64..100_000,
        ) {
            let now = Utc::now();
            let behavior = ClientBehavior {
                successful_attempts: successes,
                failed_attempts: failures,
                last_activity: now - Duration::seconds(age_seconds),
            };

            prop_assert!(behavior.risk_score(now) <= RISK_SCORE_MAX);
        }
    }
}
