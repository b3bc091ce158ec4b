//! Tiered rate-limit policy and decision types.
//!
//! A policy is an ordered list of tiers. Each tier owns an independent
//! counter per client key; tier 0 is the shortest window and later tiers
//! catch sustained abuse over longer windows.

use std::str::FromStr;

use leasegate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Severity label attached to tier rejections and security events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Low,
    /// Short burst of traffic.
    Medium,
    /// Repeated bursts.
    High,
    /// Sustained abuse.
    Critical,
}

impl Severity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(AppError::Validation(format!("unknown severity '{value}'"))),
        }
    }
}

/// Longest accepted tier window (366 days).
pub const MAX_WINDOW_SECONDS: u64 = 366 * 24 * 60 * 60;

/// One strictness level of the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitTier {
    /// Window duration in seconds.
    pub window_seconds: u64,
    /// Maximum attempts admitted within one window.
    pub max_attempts: u32,
    /// Client-facing rejection message.
    pub message: String,
    /// Severity recorded on rejection.
    pub severity: Severity,
}

impl RateLimitTier {
    /// Creates a validated tier.
    pub fn new(
        window_seconds: u64,
        max_attempts: u32,
        message: impl Into<String>,
        severity: Severity,
    ) -> AppResult<Self> {
        if window_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero".to_owned(),
            ));
        }
        if window_seconds > MAX_WINDOW_SECONDS {
            return Err(AppError::Validation(format!(
                "rate limit window must not exceed {MAX_WINDOW_SECONDS} seconds"
            )));
        }
        if max_attempts == 0 {
            return Err(AppError::Validation(
                "rate limit max attempts must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            window_seconds,
            max_attempts,
            message: message.into(),
            severity,
        })
    }

    /// Creates a tier with a generated rejection message.
    pub fn with_default_message(
        window_seconds: u64,
        max_attempts: u32,
        severity: Severity,
    ) -> AppResult<Self> {
        let message = format!(
            "Too many requests. Please wait {} before trying again.",
            describe_window(window_seconds)
        );
        Self::new(window_seconds, max_attempts, message, severity)
    }
}

fn describe_window(window_seconds: u64) -> String {
    match window_seconds {
        60 => "a minute".to_owned(),
        3600 => "an hour".to_owned(),
        seconds if seconds % 3600 == 0 => format!("{} hours", seconds / 3600),
        seconds if seconds % 60 == 0 => format!("{} minutes", seconds / 60),
        seconds => format!("{seconds} seconds"),
    }
}

/// Ordered, non-empty list of tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    tiers: Vec<RateLimitTier>,
}

impl RateLimitPolicy {
    /// Creates a policy from tiers ordered from tier 0 upwards.
    pub fn new(tiers: Vec<RateLimitTier>) -> AppResult<Self> {
        if tiers.is_empty() {
            return Err(AppError::Validation(
                "rate limit policy requires at least one tier".to_owned(),
            ));
        }

        Ok(Self { tiers })
    }

    /// Parses a `window_seconds:max_attempts:severity` comma-separated list.
    pub fn parse(value: &str) -> AppResult<Self> {
        let tiers = value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let parts = entry.split(':').map(str::trim).collect::<Vec<_>>();
                let [window, max_attempts, severity] = parts.as_slice() else {
                    return Err(AppError::Validation(format!(
                        "rate limit tier '{entry}' must look like 'window_seconds:max_attempts:severity'"
                    )));
                };

                let window_seconds = window.parse::<u64>().map_err(|error| {
                    AppError::Validation(format!("invalid tier window '{window}': {error}"))
                })?;
                let max_attempts = max_attempts.parse::<u32>().map_err(|error| {
                    AppError::Validation(format!(
                        "invalid tier max attempts '{max_attempts}': {error}"
                    ))
                })?;

                RateLimitTier::with_default_message(
                    window_seconds,
                    max_attempts,
                    Severity::from_str(severity)?,
                )
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(tiers)
    }

    /// Returns the tiers in evaluation order.
    #[must_use]
    pub fn tiers(&self) -> &[RateLimitTier] {
        &self.tiers
    }

    /// Returns the index of the final tier.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.tiers.len() - 1
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                RateLimitTier {
                    window_seconds: 60,
                    max_attempts: 10,
                    message: "Too many requests. Please wait a minute before trying again."
                        .to_owned(),
                    severity: Severity::Medium,
                },
                RateLimitTier {
                    window_seconds: 15 * 60,
                    max_attempts: 30,
                    message: "Too many requests. Please wait 15 minutes before trying again."
                        .to_owned(),
                    severity: Severity::High,
                },
                RateLimitTier {
                    window_seconds: 60 * 60,
                    max_attempts: 50,
                    message: "Too many attempts detected. Access is suspended for one hour."
                        .to_owned(),
                    severity: Severity::Critical,
                },
            ],
        }
    }
}

/// Request details attached to rate-limit audit events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Request path.
    pub endpoint: String,
    /// HTTP method.
    pub method: String,
}

impl RequestMetadata {
    /// Creates request metadata.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
        }
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Tier that decided the outcome.
    pub tier_index: usize,
    /// Seconds until the rejecting window resets.
    pub retry_after_seconds: Option<u64>,
    /// Client-facing message.
    pub message: String,
}

impl RateLimitDecision {
    /// Admission after every tier stayed under its maximum.
    #[must_use]
    pub fn allowed(tier_index: usize) -> Self {
        Self {
            allowed: true,
            tier_index,
            retry_after_seconds: None,
            message: "Request allowed".to_owned(),
        }
    }

    /// Admission because no tier could be evaluated.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            allowed: true,
            tier_index: 0,
            retry_after_seconds: None,
            message: "Request allowed (fallback)".to_owned(),
        }
    }

    /// Rejection by the given tier.
    #[must_use]
    pub fn rejected(tier_index: usize, retry_after_seconds: u64, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            tier_index,
            retry_after_seconds: Some(retry_after_seconds.max(1)),
            message: message.into(),
        }
    }
}

/// Builds the limiter key from an optional credential identifier and a
/// client network address.
#[must_use]
pub fn rate_limit_key(identity: Option<&str>, address: &str) -> String {
    let address = match address.trim() {
        "" => "unknown",
        value => value,
    };

    match identity
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
    {
        Some(identity) => format!("{identity}:{address}"),
        None => address.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        MAX_WINDOW_SECONDS, RateLimitDecision, RateLimitPolicy, RateLimitTier, Severity,
        rate_limit_key,
    };

    #[test]
    fn default_policy_escalates_windows() {
        let policy = RateLimitPolicy::default();
        let tiers = policy.tiers();

        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].window_seconds, 60);
        assert_eq!(tiers[0].max_attempts, 10);
        assert_eq!(tiers[2].window_seconds, 3600);
        assert_eq!(tiers[2].max_attempts, 50);
        assert!(tiers.windows(2).all(|pair| pair[0].window_seconds < pair[1].window_seconds));
        assert_eq!(policy.last_index(), 2);
    }

    #[test]
    fn parse_builds_tiers_with_generated_messages() {
        let policy = RateLimitPolicy::parse("60:5:medium, 900:20:high");
        assert!(policy.is_ok());

        let policy = policy.unwrap_or_default();
        assert_eq!(policy.tiers().len(), 2);
        assert_eq!(policy.tiers()[1].severity, Severity::High);
        assert_eq!(
            policy.tiers()[1].message,
            "Too many requests. Please wait 15 minutes before trying again."
        );
    }

    #[test]
    fn parse_rejects_malformed_entries() {
        assert!(RateLimitPolicy::parse("").is_err());
        assert!(RateLimitPolicy::parse("60:5").is_err());
        assert!(RateLimitPolicy::parse("sixty:5:low").is_err());
        assert!(RateLimitPolicy::parse("60:0:low").is_err());
        assert!(RateLimitPolicy::parse("60:5:urgent").is_err());
    }

    #[test]
    fn tier_rejects_zero_window() {
        assert!(RateLimitTier::new(0, 5, "x", Severity::Low).is_err());
    }

    #[test]
    fn tier_rejects_windows_longer_than_a_year() {
        assert!(RateLimitTier::new(MAX_WINDOW_SECONDS, 5, "x", Severity::Low).is_ok());
        assert!(RateLimitTier::new(MAX_WINDOW_SECONDS + 1, 5, "x", Severity::Low).is_err());
        assert!(RateLimitPolicy::parse("18446744073709551615:5:low").is_err());
        assert!(RateLimitPolicy::parse("9223372036854775807:5:low").is_err());
    }

    #[test]
    fn rejection_retry_after_is_at_least_one_second() {
        let decision = RateLimitDecision::rejected(1, 0, "slow down");
        assert_eq!(decision.retry_after_seconds, Some(1));
        assert!(!decision.allowed);
    }

    #[test]
    fn key_combines_identity_and_address() {
        assert_eq!(
            rate_limit_key(Some(" Tenant@Example.com "), "203.0.113.7"),
            "tenant@example.com:203.0.113.7"
        );
        assert_eq!(rate_limit_key(Some("  "), "203.0.113.7"), "203.0.113.7");
        assert_eq!(rate_limit_key(None, ""), "unknown");
    }
}
