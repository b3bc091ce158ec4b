use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use leasegate_core::{AppError, AppResult, TenantId};
use leasegate_domain::RateLimitPolicy;
use tracing_subscriber::EnvFilter;

/// Minimum accepted length of the upstream gateway secret.
pub const MIN_GATEWAY_SECRET_LENGTH: usize = 32;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCommand {
    /// Run migrations and serve HTTP.
    Serve,
    /// Run migrations and exit.
    Migrate,
    /// Run migrations, grant the tenant admin role to a subject and exit.
    BootstrapAdmin {
        tenant_id: TenantId,
        subject: String,
    },
}

impl ApiCommand {
    fn parse(args: &[String]) -> AppResult<Self> {
        match args.first().map(String::as_str) {
            None => Ok(Self::Serve),
            Some("migrate") => Ok(Self::Migrate),
            Some("bootstrap-admin") => {
                let (Some(tenant_id), Some(subject)) = (args.get(1), args.get(2)) else {
                    return Err(AppError::Validation(
                        "usage: leasegate-api bootstrap-admin <tenant_id> <subject>".to_owned(),
                    ));
                };
                let subject = subject.trim();
                if subject.is_empty() {
                    return Err(AppError::Validation(
                        "bootstrap-admin subject must not be empty".to_owned(),
                    ));
                }

                Ok(Self::BootstrapAdmin {
                    tenant_id: TenantId::from_str(tenant_id)?,
                    subject: subject.to_owned(),
                })
            }
            Some(other) => Err(AppError::Validation(format!(
                "unknown command '{other}', expected 'migrate' or 'bootstrap-admin'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStoreConfig {
    Postgres,
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventSinkConfig {
    Log,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub command: ApiCommand,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub gateway_shared_secret: String,
    pub rate_limit_store: RateLimitStoreConfig,
    pub rate_limit_policy: RateLimitPolicy,
    pub rate_limit_cleanup_interval_seconds: u64,
    pub store_timeout: Duration,
    pub permission_cache_ttl_seconds: u32,
    pub permission_cache_capacity: usize,
    pub adaptive_tracker_capacity: usize,
    pub security_event_sink: SecurityEventSinkConfig,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        let args = env::args().skip(1).collect::<Vec<_>>();
        Self::from_lookup(&args, |name| env::var(name).ok())
    }

    fn from_lookup(args: &[String], lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let command = ApiCommand::parse(args)?;
        let database_url = required_non_empty(&lookup, "DATABASE_URL")?;
        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&lookup, "API_PORT", 3001_u16)?;

        let gateway_shared_secret = required_non_empty(&lookup, "GATEWAY_SHARED_SECRET")?;
        if gateway_shared_secret.len() < MIN_GATEWAY_SECRET_LENGTH {
            return Err(AppError::Validation(format!(
                "GATEWAY_SHARED_SECRET must be at least {MIN_GATEWAY_SECRET_LENGTH} characters"
            )));
        }

        let rate_limit_store = match lookup("RATE_LIMIT_STORE")
            .unwrap_or_else(|| "postgres".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => RateLimitStoreConfig::Postgres,
            "redis" => RateLimitStoreConfig::Redis,
            "memory" => RateLimitStoreConfig::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "RATE_LIMIT_STORE must be 'postgres', 'redis' or 'memory', got '{other}'"
                )));
            }
        };
        if rate_limit_store == RateLimitStoreConfig::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned(),
            ));
        }

        let rate_limit_policy = match lookup("RATE_LIMIT_TIERS").filter(|value| !value.trim().is_empty()) {
            Some(value) => RateLimitPolicy::parse(value.as_str())?,
            None => RateLimitPolicy::default(),
        };

        let rate_limit_cleanup_interval_seconds =
            parse_or(&lookup, "RATE_LIMIT_CLEANUP_INTERVAL_SECONDS", 300_u64)?;
        if rate_limit_cleanup_interval_seconds == 0 {
            return Err(AppError::Validation(
                "RATE_LIMIT_CLEANUP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let store_timeout_ms = parse_or(&lookup, "STORE_TIMEOUT_MS", 2000_u64)?;
        if store_timeout_ms == 0 {
            return Err(AppError::Validation(
                "STORE_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        let permission_cache_ttl_seconds = parse_or(&lookup, "PERMISSION_CACHE_TTL_SECONDS", 30_u32)?;
        let permission_cache_capacity = parse_or(&lookup, "PERMISSION_CACHE_CAPACITY", 1024_usize)?;
        let adaptive_tracker_capacity = parse_or(&lookup, "ADAPTIVE_TRACKER_CAPACITY", 1000_usize)?;
        if permission_cache_capacity == 0 || adaptive_tracker_capacity == 0 {
            return Err(AppError::Validation(
                "PERMISSION_CACHE_CAPACITY and ADAPTIVE_TRACKER_CAPACITY must be greater than zero"
                    .to_owned(),
            ));
        }

        let security_event_sink = match lookup("SECURITY_EVENT_SINK")
            .unwrap_or_else(|| "log".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "log" => SecurityEventSinkConfig::Log,
            "postgres" => SecurityEventSinkConfig::Postgres,
            other => {
                return Err(AppError::Validation(format!(
                    "SECURITY_EVENT_SINK must be either 'log' or 'postgres', got '{other}'"
                )));
            }
        };

        Ok(Self {
            command,
            database_url,
            redis_url,
            api_host,
            api_port,
            gateway_shared_secret,
            rate_limit_store,
            rate_limit_policy,
            rate_limit_cleanup_interval_seconds,
            store_timeout: Duration::from_millis(store_timeout_ms),
            permission_cache_ttl_seconds,
            permission_cache_capacity,
            adaptive_tracker_capacity,
            security_event_sink,
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    /// Returns whether the configured backends need a Redis connection.
    #[must_use]
    pub fn redis_required(&self) -> bool {
        self.rate_limit_store == RateLimitStoreConfig::Redis
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use leasegate_core::AppError;

    use super::{ApiCommand, ApiConfig, RateLimitStoreConfig, SecurityEventSinkConfig};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(args: &[&str], vars: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let vars = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        let args = args.iter().map(|arg| (*arg).to_owned()).collect::<Vec<_>>();

        ApiConfig::from_lookup(&args, |name| vars.get(name).cloned())
    }

    fn base_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://leasegate@localhost/leasegate"),
            ("GATEWAY_SHARED_SECRET", SECRET),
        ]
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let Ok(config) = load(&[], &base_vars()) else {
            panic!("base configuration should load");
        };

        assert_eq!(config.command, ApiCommand::Serve);
        assert_eq!(config.api_port, 3001);
        assert_eq!(config.rate_limit_store, RateLimitStoreConfig::Postgres);
        assert_eq!(config.rate_limit_policy.tiers().len(), 3);
        assert_eq!(config.store_timeout, Duration::from_millis(2000));
        assert_eq!(config.permission_cache_ttl_seconds, 30);
        assert_eq!(config.permission_cache_capacity, 1024);
        assert_eq!(config.adaptive_tracker_capacity, 1000);
        assert_eq!(config.security_event_sink, SecurityEventSinkConfig::Log);
        assert!(!config.redis_required());
        assert!(config.socket_address().is_ok());
    }

    #[test]
    fn short_gateway_secret_is_rejected() {
        let result = load(
            &[],
            &[
                ("DATABASE_URL", "postgres://localhost/leasegate"),
                ("GATEWAY_SHARED_SECRET", "too-short"),
            ],
        );

        assert!(matches!(result, Err(AppError::Validation(message)) if message.contains("GATEWAY_SHARED_SECRET")));
    }

    #[test]
    fn redis_store_requires_redis_url() {
        let mut vars = base_vars();
        vars.push(("RATE_LIMIT_STORE", "redis"));
        assert!(load(&[], &vars).is_err());

        vars.push(("REDIS_URL", "redis://127.0.0.1:6379"));
        let Ok(config) = load(&[], &vars) else {
            panic!("redis configuration should load");
        };
        assert!(config.redis_required());
    }

    #[test]
    fn custom_tiers_and_unknown_backends() {
        let mut vars = base_vars();
        vars.push(("RATE_LIMIT_TIERS", "30:5:low,600:20:critical"));
        let Ok(config) = load(&[], &vars) else {
            panic!("custom tiers should load");
        };
        assert_eq!(config.rate_limit_policy.tiers().len(), 2);
        assert_eq!(config.rate_limit_policy.tiers()[0].max_attempts, 5);

        let mut vars = base_vars();
        vars.push(("SECURITY_EVENT_SINK", "kafka"));
        assert!(load(&[], &vars).is_err());

        let mut vars = base_vars();
        vars.push(("STORE_TIMEOUT_MS", "soon"));
        assert!(load(&[], &vars).is_err());
    }

    #[test]
    fn commands_are_parsed_from_arguments() {
        let Ok(config) = load(&["migrate"], &base_vars()) else {
            panic!("migrate command should load");
        };
        assert_eq!(config.command, ApiCommand::Migrate);

        let tenant = "5b1c0c84-5a1f-4d5c-9a8e-0d1d1c1f6a10";
        let Ok(config) = load(&["bootstrap-admin", tenant, " alice "], &base_vars()) else {
            panic!("bootstrap-admin command should load");
        };
        assert!(matches!(
            config.command,
            ApiCommand::BootstrapAdmin { ref subject, .. } if subject == "alice"
        ));

        assert!(load(&["bootstrap-admin", tenant], &base_vars()).is_err());
        assert!(load(&["serve-forever"], &base_vars()).is_err());
    }
}
