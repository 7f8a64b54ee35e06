//! Flockwise Server: application entry point.

mod config;

use anyhow::{Context, Result};
use flockwise_db::repository::{
    SurrealBatchRepository, SurrealDailyLogRepository, SurrealExpenseRepository,
    SurrealMembershipRepository, SurrealUserRepository,
};
use flockwise_db::DbManager;
use flockwise_service::{BatchService, TeamContextService, TracingNotifier};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                config
                    .log_directive
                    .parse()
                    .context("Failed to parse FLOCKWISE_LOG")?,
            ),
        )
        .json()
        .init();

    tracing::info!("Starting Flockwise server...");

    let manager = DbManager::open(&config.db)
        .await
        .with_context(|| format!("Failed to open store {}", config.db.target()))?;
    let db = manager.client().clone();

    let user_repo = match config.password_pepper.clone() {
        Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper),
        None => SurrealUserRepository::new(db.clone()),
    };
    let _team_context =
        TeamContextService::new(SurrealMembershipRepository::new(db.clone()), user_repo);
    let _batches = BatchService::new(
        SurrealBatchRepository::new(db.clone()),
        SurrealDailyLogRepository::new(db.clone()),
        SurrealExpenseRepository::new(db),
        TracingNotifier,
        config.ops.clone(),
    );

    tracing::info!(
        page_size = config.ops.default_page_size,
        over_mortality = config.ops.over_mortality_policy.as_str(),
        discrepancy_tolerance = config.ops.discrepancy_tolerance,
        "Flockwise services ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Flockwise server stopped.");
    Ok(())
}
