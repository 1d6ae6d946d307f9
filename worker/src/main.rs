// Worker binary entry point
//
// Hosts both sides of the engine in one process: the poll worker and the
// scheduled job runner share nothing but their shutdown coordinators.

use anyhow::Result;
use async_trait::async_trait;
use common::config::Settings;
use common::errors::ExecutionError;
use common::models::JobRecord;
use common::registry::{ExecutableJob, JobContext, JobRegistry};
use common::schedule::Recurrence;
use common::scheduler::{
    RecurringJob, RecurringJobBody, ScheduledJobRunner, ScheduledRunnerConfig,
};
use common::store::{JobStore, RedisJobStore};
use common::telemetry;
use common::worker::{PollWorker, PollWorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// Built-in job type that logs the record it was handed
struct EchoJob;

#[async_trait]
impl ExecutableJob for EchoJob {
    async fn dequeue(
        &self,
        context: &JobContext,
        record: &JobRecord,
    ) -> Result<(), ExecutionError> {
        info!(job_id = %record.id, queue = %context.queue, "Echo job executed");
        Ok(())
    }
}

/// Built-in recurring job that logs engine liveness once a minute
struct HeartbeatJob;

#[async_trait]
impl RecurringJobBody for HeartbeatJob {
    async fn execute(&self) -> Result<(), ExecutionError> {
        info!("Heartbeat");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Bootstrap logging before configuration so load failures are visible
    telemetry::init_logging("info")
        .map_err(|e| anyhow::anyhow!("Logging initialization error: {}", e))?;

    info!("Starting Conveyor worker");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!(
        store_url = %settings.store.url,
        queues = ?settings.worker.queues,
        "Configuration loaded"
    );

    telemetry::describe_metrics();

    // Initialize the job store client
    let store: Arc<dyn JobStore> = Arc::new(RedisJobStore::new(&settings.store).await.map_err(
        |e| {
            error!(error = %e, "Failed to initialize job store");
            anyhow::anyhow!("Job store initialization error: {}", e)
        },
    )?);

    info!("Job store initialized");

    // Register job types; hosts extend this set with their own executors
    let mut registry = JobRegistry::new();
    registry.register("echo", Arc::new(EchoJob));
    let registry = Arc::new(registry);

    // Create the poll worker
    let poll_config = PollWorkerConfig {
        queues: settings.worker.queues.clone(),
        poll_interval: Duration::from_secs(settings.worker.poll_interval_seconds),
        key_prefix: settings.store.key_prefix.clone(),
    };
    let poll_worker = PollWorker::new(poll_config, store, registry);

    // Create the scheduled job runner
    let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig {
        entry_retention: settings.scheduler.entry_retention,
    });
    runner.register(RecurringJob {
        name: "heartbeat".to_string(),
        rule: Recurrence::every_seconds(60),
        body: Arc::new(HeartbeatJob),
    });

    // Start both engines
    poll_worker.start().map_err(|e| {
        error!(error = %e, "Failed to start poll worker");
        anyhow::anyhow!("Poll worker startup error: {}", e)
    })?;
    runner.start().map_err(|e| {
        error!(error = %e, "Failed to start scheduled job runner");
        anyhow::anyhow!("Scheduled job runner startup error: {}", e)
    })?;

    info!("Worker is running. Press Ctrl+C to shutdown gracefully");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, initiating graceful shutdown");
        }
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    }

    // Cooperative drain: in-flight work finishes, no new timers are armed
    poll_worker.request_shutdown();
    runner.request_shutdown();

    info!("Waiting for in-flight work to complete");
    poll_worker.wait_complete().await;
    runner.wait_complete().await;

    info!("Worker shutdown complete");
    Ok(())
}
