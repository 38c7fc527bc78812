///! Scheduled task manager
///!
///! Periodic background tasks:
///! - Ingestion pass (every `interval_minutes`, aligned on the UTC day)
///! - Retention purge (daily at 03:00 UTC)

use super::plan::PlanOrchestrator;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Hour (UTC) of the daily purge
const PURGE_HOUR: u32 = 3;

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// Interval between ingestion passes (in minutes)
    pub run_interval_minutes: u64,

    /// Upper bound for one ingestion pass (in seconds)
    pub run_timeout_secs: u64,

    /// Perform a pass immediately at startup
    pub perform_initial_run: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            run_interval_minutes: 60,
            run_timeout_secs: 1800,
            perform_initial_run: true,
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    orchestrator: Arc<PlanOrchestrator>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(config: ScheduledTaskConfig, orchestrator: Arc<PlanOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            task_handles: Vec::new(),
        }
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        let run_handle = self.start_ingestion_task();
        self.task_handles.push(run_handle);

        let purge_handle = self.start_purge_task();
        self.task_handles.push(purge_handle);

        tracing::info!(
            "Started {} scheduled tasks (ingestion every {} min, purge daily at {:02}:00 UTC)",
            self.task_handles.len(),
            self.config.run_interval_minutes,
            PURGE_HOUR
        );
    }

    fn start_ingestion_task(&self) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();
        let config = self.config.clone();

        tracing::info!(
            "Scheduling ingestion task (interval: {} minutes, initial: {})",
            config.run_interval_minutes,
            config.perform_initial_run
        );

        tokio::spawn(async move {
            if config.perform_initial_run {
                tracing::info!("Performing initial ingestion pass...");
                if let Err(e) = Self::run_ingestion(&orchestrator, config.run_timeout_secs).await {
                    tracing::error!("Initial ingestion pass failed: {:#}", e);
                }
            }

            Self::ingestion_loop(orchestrator, config).await;
        })
    }

    async fn ingestion_loop(orchestrator: Arc<PlanOrchestrator>, config: ScheduledTaskConfig) {
        loop {
            let now = Utc::now();
            let next_trigger = Self::calculate_next_run_time(now, config.run_interval_minutes);
            let sleep_duration = (next_trigger - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));

            tracing::info!(
                "Next ingestion pass at: {} (in {:.1} min)",
                next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
                sleep_duration.as_secs_f64() / 60.0
            );

            tokio::time::sleep(sleep_duration).await;

            if let Err(e) = Self::run_ingestion(&orchestrator, config.run_timeout_secs).await {
                tracing::error!("Ingestion pass failed: {:#}", e);
            }
        }
    }

    /// Next multiple of `interval_minutes` counted from UTC midnight
    fn calculate_next_run_time(now: DateTime<Utc>, interval_minutes: u64) -> DateTime<Utc> {
        let interval = interval_minutes.clamp(1, 24 * 60) as i64;
        let minute_of_day = (now.hour() * 60 + now.minute()) as i64;
        let next_slot = (minute_of_day / interval + 1) * interval;

        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        midnight + ChronoDuration::minutes(next_slot)
    }

    /// Reloads the datatake index, runs one pass and rewrites the exports
    async fn run_ingestion(orchestrator: &Arc<PlanOrchestrator>, timeout_secs: u64) -> anyhow::Result<()> {
        if let Err(e) = orchestrator.reload_index().await {
            tracing::warn!("Keeping previous datatake index: {:#}", e);
        }

        let timeout_duration = Duration::from_secs(timeout_secs);
        let report = match tokio::time::timeout(timeout_duration, orchestrator.run(Utc::now())).await {
            Ok(report) => report,
            Err(_) => anyhow::bail!("Ingestion pass timed out after {} seconds", timeout_duration.as_secs()),
        };
        tracing::info!(
            "Ingestion pass: {} units, {} successful, {} skipped, {} failed",
            report.outcomes.len(),
            report.successful(),
            report.skipped(),
            report.failed()
        );

        orchestrator.write_exports().await?;
        Ok(())
    }

    fn start_purge_task(&self) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();

        tracing::info!("Scheduling retention purge task (daily at {:02}:00 UTC)", PURGE_HOUR);

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next_trigger = Self::calculate_next_purge_time(now);
                let sleep_duration = (next_trigger - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(3600));

                tracing::info!(
                    "Next retention purge at: {} (in {:.1} hours)",
                    next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
                    sleep_duration.as_secs_f64() / 3600.0
                );

                tokio::time::sleep(sleep_duration).await;

                match orchestrator.purge_all(Utc::now().date_naive()).await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!("Retention purge completed: removed {} day fragments", removed)
                    }
                    Ok(_) => tracing::debug!("Retention purge completed: nothing to remove"),
                    Err(e) => tracing::error!("Retention purge failed: {:#}", e),
                }
            }
        })
    }

    /// Today at 03:00 UTC if still ahead, tomorrow otherwise
    fn calculate_next_purge_time(now: DateTime<Utc>) -> DateTime<Utc> {
        let at_purge_hour = |day: chrono::NaiveDate| {
            day.and_time(NaiveTime::MIN).and_utc() + ChronoDuration::hours(PURGE_HOUR as i64)
        };
        let today = at_purge_hour(now.date_naive());
        if now < today {
            today
        } else {
            at_purge_hour(now.date_naive() + ChronoDuration::days(1))
        }
    }

    /// Gracefully shutdown all tasks
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        for handle in self.task_handles {
            handle.abort();
        }

        tracing::info!("All scheduled tasks stopped");
    }
}
