use acqplan_backend::config::PlanConfig;
use acqplan_backend::module::plan::PlanOrchestrator;
use acqplan_backend::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        PlanConfig::from_file(&config_path)
            .context(format!("Failed to load configuration from {}", config_path))?
    } else {
        PlanConfig::default()
    };
    let config = Arc::new(config);

    // Initialize logging
    let _logging_guard = acqplan_backend::logging::init_logging(
        &config.log_dir,
        "acqplan-backend",
        &config.log_level,
        config.ingestion.retention_days.max(1) as u64,
    )?;

    tracing::info!("Acquisition plan backend starting...");
    if config_found {
        tracing::info!("Configuration loaded from {}", config_path);
    } else {
        tracing::warn!("{} not found, using built-in defaults", config_path);
    }
    tracing::info!(
        "Missions: {:?}, data directory: {:?}",
        config.configured_missions(),
        config.data_dir
    );

    let orchestrator = Arc::new(PlanOrchestrator::from_config(config.clone())?);
    if let Err(e) = orchestrator.reload_index().await {
        tracing::warn!("Starting without datatake index: {:#}", e);
    }

    // Configure and start scheduled tasks
    let task_config = ScheduledTaskConfig {
        run_interval_minutes: config.ingestion.interval_minutes,
        perform_initial_run: config.ingestion.perform_initial_run,
        ..Default::default()
    };
    let mut task_manager = ScheduledTaskManager::new(task_config, orchestrator);
    task_manager.start_all();
    tracing::info!("All scheduled tasks started successfully");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    task_manager.shutdown().await;

    Ok(())
}
