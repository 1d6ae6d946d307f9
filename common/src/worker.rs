// Poll worker: timer-driven fetch/gate/dispatch/finalize loop per queue
//
// Ticks on one queue never overlap; the timer is serviced only after the
// previous tick resolves. Errors local to one tick are logged and the
// loop continues. Exactly one store mutation (requeue or completed)
// happens per tick that fetched a record.

use crate::errors::{ExecutionError, StoreError, WorkerError};
use crate::models::{storage_key, JobRecord};
use crate::registry::{JobContext, JobRegistry};
use crate::retry::run_with_retry;
use crate::shutdown::ShutdownCoordinator;
use crate::store::JobStore;
use chrono::Utc;
use futures::future::join_all;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the poll worker
#[derive(Debug, Clone)]
pub struct PollWorkerConfig {
    /// Logical queue names, one poll timer each
    pub queues: Vec<String>,
    pub poll_interval: Duration,
    /// Persistence namespace for queue keys
    pub key_prefix: String,
}

impl Default for PollWorkerConfig {
    fn default() -> Self {
        Self {
            queues: vec!["default".to_string()],
            poll_interval: Duration::from_secs(10),
            key_prefix: "conveyor".to_string(),
        }
    }
}

/// Dequeues persisted records and executes them with bounded retry
pub struct PollWorker {
    config: PollWorkerConfig,
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl PollWorker {
    pub fn new(
        config: PollWorkerConfig,
        store: Arc<dyn JobStore>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    /// Request a drain; the in-flight tick completes, no further timer is
    /// armed.
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Resolves once every queue loop has stopped.
    pub async fn wait_complete(&self) {
        self.shutdown.wait_complete().await;
    }

    /// Validate configuration and spawn one poll loop per queue.
    ///
    /// Completion is signaled once all queue loops have stopped after a
    /// shutdown request.
    #[instrument(skip(self), fields(queues = self.config.queues.len()))]
    pub fn start(&self) -> Result<(), WorkerError> {
        if self.config.queues.is_empty() {
            return Err(WorkerError::NoQueuesConfigured);
        }

        info!(
            poll_interval_seconds = self.config.poll_interval.as_secs(),
            "Starting poll worker"
        );

        let mut handles = Vec::with_capacity(self.config.queues.len());
        for queue in &self.config.queues {
            let poller = QueuePoller {
                queue: queue.clone(),
                key: storage_key(&self.config.key_prefix, queue),
                poll_interval: self.config.poll_interval,
                store: Arc::clone(&self.store),
                registry: Arc::clone(&self.registry),
                shutdown: Arc::clone(&self.shutdown),
            };
            handles.push(tokio::spawn(poller.run()));
        }

        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            join_all(handles).await;
            info!("All queue loops stopped");
            shutdown.signal_complete();
        });

        Ok(())
    }
}

/// One queue's poll loop: Idle → Fetching → Gating → Dispatching →
/// Finalizing → Idle, with ShuttingDown reachable from Idle.
struct QueuePoller {
    queue: String,
    key: String,
    poll_interval: Duration,
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl QueuePoller {
    #[instrument(skip(self), fields(queue = %self.queue, key = %self.key))]
    async fn run(self) {
        info!("Queue poll loop started");

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown.request_watcher();

        loop {
            if self.shutdown.is_shutdown_requested() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        // Degraded tick: log and wait for the next interval.
                        error!(error = %e, "Tick failed");
                    }
                    if self.shutdown.is_shutdown_requested() {
                        break;
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || self.shutdown.is_shutdown_requested() {
                        break;
                    }
                }
            }
        }

        info!("Queue poll loop stopped");
    }

    /// One fetch-gate-dispatch-finalize cycle. A fetch failure fails the
    /// tick; everything after the fetch is finalized regardless.
    async fn tick(&self) -> Result<(), StoreError> {
        counter!("poll_ticks_total", "queue" => self.queue.clone()).increment(1);

        let Some(record) = self.store.get(&self.key).await? else {
            debug!("No record available");
            return Ok(());
        };

        counter!("jobs_dequeued_total", "queue" => self.queue.clone()).increment(1);
        self.process_record(record).await;
        Ok(())
    }

    #[instrument(skip(self, record), fields(job_id = %record.id, job_name = %record.job_name))]
    async fn process_record(&self, record: JobRecord) {
        // Gating: a delayed record goes back unexecuted and unmodified,
        // without consuming retry budget.
        if record.is_delayed(Utc::now()) {
            debug!(delay_until = ?record.delay_until, "Record still delayed, requeueing");
            counter!("jobs_delayed_total", "queue" => self.queue.clone()).increment(1);
            if let Err(e) = self.store.requeue(&self.key, &record).await {
                error!(error = %e, "Failed to requeue delayed record");
            }
            return;
        }

        let context = JobContext {
            queue: self.queue.clone(),
            storage_key: self.key.clone(),
        };

        // Dispatching: resolve executable behavior, run with the record's
        // own retry budget.
        let terminal_failure = match self.registry.resolve(&record.job_name) {
            Some(job) => {
                let result =
                    run_with_retry(|| job.dequeue(&context, &record), record.max_retry_count)
                        .await;
                match result {
                    Ok(()) => {
                        info!("Job completed");
                        None
                    }
                    Err(e) => {
                        counter!("jobs_exhausted_total").increment(1);
                        error!(
                            error = %e,
                            attempts = record.max_retry_count + 1,
                            "Job failed after exhausting retry budget"
                        );
                        Some((job, e))
                    }
                }
            }
            None => {
                // Finalized anyway so the record cannot poison the queue.
                let e = ExecutionError::UnregisteredJobType(record.job_name.clone());
                counter!("jobs_unregistered_total").increment(1);
                error!(error = %e, "No job type registered for this record");
                None
            }
        };

        // Error hook for terminal failures; a hook failure is logged, the
        // record has already reached a terminal state semantically.
        if let Some((job, final_error)) = terminal_failure {
            if let Err(hook_err) = job.on_error(&context, &final_error, &record).await {
                let e = ExecutionError::HookFailed(hook_err.to_string());
                warn!(error = %e, "Error hook failed");
            }
        }

        // Finalizing
        if let Err(e) = self.store.completed(&self.key, &record).await {
            error!(error = %e, "Failed to finalize record");
        }
    }
}
