//! Leasegate HTTP API composition root.

mod api_config;
mod api_router;
mod api_services;
mod client_address;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::time::Duration;

use leasegate_application::RateLimitService;
use leasegate_core::AppError;
use leasegate_infrastructure::PostgresSecurityAdminRepository;
use tracing::{info, warn};

use crate::api_config::{ApiCommand, ApiConfig, init_tracing};
use crate::api_router::build_router;
use crate::api_services::{build_app_state, connect_and_migrate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = connect_and_migrate(&config.database_url).await?;
    info!("database migrations applied successfully");

    match &config.command {
        ApiCommand::Migrate => return Ok(()),
        ApiCommand::BootstrapAdmin { tenant_id, subject } => {
            let role_id = PostgresSecurityAdminRepository::new(pool)
                .ensure_tenant_admin(*tenant_id, subject.as_str())
                .await?;
            info!(tenant_id = %tenant_id, subject = %subject, role_id = %role_id, "tenant admin bootstrapped");
            return Ok(());
        }
        ApiCommand::Serve => {}
    }

    let app_state = build_app_state(pool, &config)?;
    spawn_rate_limit_cleanup(
        app_state.rate_limit_service.clone(),
        Duration::from_secs(config.rate_limit_cleanup_interval_seconds),
    );

    let app = build_router(app_state);
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "leasegate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn spawn_rate_limit_cleanup(rate_limit_service: RateLimitService, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match rate_limit_service.cleanup().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired rate limit counters removed"),
                Err(error) => warn!(error = %error, "rate limit counter cleanup failed"),
            }
        }
    });
}
