// Scheduled job runner: self-perpetuating timer chains for recurring jobs
//
// Each registered job owns exactly one outstanding timer. A firing runs
// the job body, recomputes the next fire date from the previous scheduled
// date (never from "now"), appends a log entry, and arms the next timer.
// Chains of different jobs are fully concurrent; firings of the same job
// never overlap.

use crate::errors::WorkerError;
use crate::models::ScheduledJobEntry;
use crate::schedule::Recurrence;
use crate::shutdown::ShutdownCoordinator;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, instrument};

/// Zero-argument body of a recurring job
#[async_trait]
pub trait RecurringJobBody: Send + Sync {
    async fn execute(&self) -> Result<(), crate::errors::ExecutionError>;
}

/// A recurring job definition paired with its recurrence rule
#[derive(Clone)]
pub struct RecurringJob {
    pub name: String,
    pub rule: Recurrence,
    pub body: Arc<dyn RecurringJobBody>,
}

/// Configuration for the scheduled job runner
#[derive(Debug, Clone)]
pub struct ScheduledRunnerConfig {
    /// Latest-N retention bound for the firing log
    pub entry_retention: usize,
}

impl Default for ScheduledRunnerConfig {
    fn default() -> Self {
        Self {
            entry_retention: 256,
        }
    }
}

/// Log of scheduled fire dates, appended once per armed timer.
///
/// Retention is bounded: only the latest N entries are kept.
pub struct ScheduleLog {
    entries: Mutex<VecDeque<ScheduledJobEntry>>,
    retention: usize,
}

impl ScheduleLog {
    fn new(retention: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            retention,
        }
    }

    pub fn append(&self, entry: ScheduledJobEntry) {
        let mut entries = self.entries.lock().expect("schedule log mutex poisoned");
        entries.push_back(entry);
        while entries.len() > self.retention {
            entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<ScheduledJobEntry> {
        self.entries
            .lock()
            .expect("schedule log mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("schedule log mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs registered recurring jobs on their computed schedules
pub struct ScheduledJobRunner {
    config: ScheduledRunnerConfig,
    jobs: Vec<RecurringJob>,
    log: Arc<ScheduleLog>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl ScheduledJobRunner {
    pub fn new(config: ScheduledRunnerConfig) -> Self {
        let retention = config.entry_retention;
        Self {
            config,
            jobs: Vec::new(),
            log: Arc::new(ScheduleLog::new(retention)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    pub fn register(&mut self, job: RecurringJob) {
        info!(job_name = %job.name, "Registered recurring job");
        self.jobs.push(job);
    }

    pub fn schedule_log(&self) -> Arc<ScheduleLog> {
        Arc::clone(&self.log)
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    /// Request a drain; each chain's next natural firing is its last.
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub async fn wait_complete(&self) {
        self.shutdown.wait_complete().await;
    }

    /// Compute initial fire dates and spawn one chain per schedulable job.
    ///
    /// A job whose rule cannot produce an initial date is permanently
    /// disabled (logged, not retried). Zero registered jobs signal
    /// completion immediately; zero schedulable jobs is a startup error.
    #[instrument(skip(self), fields(jobs = self.jobs.len()))]
    pub fn start(&self) -> Result<(), WorkerError> {
        if self.jobs.is_empty() {
            info!("No recurring jobs registered, nothing to run");
            self.shutdown.signal_complete();
            return Ok(());
        }

        let now = Utc::now();
        let mut armed = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            match job.rule.resolve_next(now) {
                Ok(next_fire) => armed.push((job.clone(), next_fire)),
                Err(e) => {
                    counter!("schedules_disabled_total").increment(1);
                    error!(
                        job_name = %job.name,
                        error = %e,
                        "Recurrence rule unsatisfiable, job permanently disabled"
                    );
                }
            }
        }

        if armed.is_empty() {
            return Err(WorkerError::NoSatisfiableSchedules);
        }

        info!(
            chains = armed.len(),
            entry_retention = self.config.entry_retention,
            "Starting scheduled job runner"
        );

        let live_chains = Arc::new(AtomicUsize::new(armed.len()));
        for (job, next_fire) in armed {
            self.log.append(ScheduledJobEntry {
                job_name: job.name.clone(),
                next_fire_date: next_fire,
                recorded_at: Utc::now(),
            });
            let chain = FireChain {
                job,
                log: Arc::clone(&self.log),
                shutdown: Arc::clone(&self.shutdown),
                live_chains: Arc::clone(&live_chains),
            };
            tokio::spawn(chain.run(next_fire));
        }

        Ok(())
    }
}

/// One recurring job's firing chain
struct FireChain {
    job: RecurringJob,
    log: Arc<ScheduleLog>,
    shutdown: Arc<ShutdownCoordinator>,
    live_chains: Arc<AtomicUsize>,
}

impl FireChain {
    #[instrument(skip(self), fields(job_name = %self.job.name))]
    async fn run(self, mut next_fire: DateTime<Utc>) {
        info!(next_fire = %next_fire, "Recurring job chain armed");

        loop {
            sleep_until_fire(next_fire).await;

            // The one-shot timer has fired; under a drain request this
            // firing does no work and the chain stops.
            if self.shutdown.is_shutdown_requested() {
                info!("Shutdown requested, stopping chain");
                break;
            }

            counter!("recurring_firings_total", "job" => self.job.name.clone()).increment(1);
            if let Err(e) = self.job.body.execute().await {
                // Failed firings still reschedule.
                error!(error = %e, "Recurring job body failed");
            }

            // The next fire date derives from the previous scheduled date,
            // not from the wall clock after execution.
            match self.job.rule.resolve_next(next_fire) {
                Ok(next) => {
                    self.log.append(ScheduledJobEntry {
                        job_name: self.job.name.clone(),
                        next_fire_date: next,
                        recorded_at: Utc::now(),
                    });
                    next_fire = next;
                }
                Err(e) => {
                    counter!("schedules_disabled_total").increment(1);
                    error!(error = %e, "Recurrence exhausted, job permanently disabled");
                    break;
                }
            }
        }

        // Every stopped chain counts down, drained or disabled alike; the
        // last one out raises the completion signal.
        if self.live_chains.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shutdown.signal_complete();
        }
    }
}

async fn sleep_until_fire(fire: DateTime<Utc>) {
    let wait = (fire - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    tokio::time::sleep(wait).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExecutionError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingBody {
        firings: AtomicU32,
        fail: bool,
    }

    impl CountingBody {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                firings: AtomicU32::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl RecurringJobBody for CountingBody {
        async fn execute(&self) -> Result<(), ExecutionError> {
            self.firings.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExecutionError::JobFailed("body failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_schedule_log_retention_bound() {
        let log = ScheduleLog::new(3);
        for i in 0..10 {
            log.append(ScheduledJobEntry {
                job_name: format!("job-{}", i),
                next_fire_date: Utc::now(),
                recorded_at: Utc::now(),
            });
        }
        let entries = log.snapshot();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].job_name, "job-7");
        assert_eq!(entries[2].job_name, "job-9");
    }

    #[tokio::test]
    async fn test_zero_registered_jobs_completes_immediately() {
        let runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.start().unwrap();
        runner.wait_complete().await;
        assert!(runner.schedule_log().is_empty());
    }

    #[tokio::test]
    async fn test_all_unsatisfiable_rules_fail_startup() {
        let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.register(RecurringJob {
            name: "broken".to_string(),
            rule: Recurrence::cron("not a cron rule"),
            body: CountingBody::new(false),
        });
        assert!(matches!(
            runner.start(),
            Err(WorkerError::NoSatisfiableSchedules)
        ));
    }

    #[tokio::test]
    async fn test_unsatisfiable_job_dropped_but_others_run() {
        let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.register(RecurringJob {
            name: "broken".to_string(),
            rule: Recurrence::cron("not a cron rule"),
            body: CountingBody::new(false),
        });
        runner.register(RecurringJob {
            name: "healthy".to_string(),
            rule: Recurrence::every_seconds(3600),
            body: CountingBody::new(false),
        });
        runner.start().unwrap();
        let entries = runner.schedule_log().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].job_name, "healthy");
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_fire_computed_from_previous_scheduled_date() {
        let body = CountingBody::new(false);
        let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.register(RecurringJob {
            name: "every-second".to_string(),
            rule: Recurrence::every_seconds(1),
            body: Arc::clone(&body) as Arc<dyn RecurringJobBody>,
        });
        runner.start().unwrap();

        let log = runner.schedule_log();
        let armed = log.snapshot();
        let first_fire = armed[0].next_fire_date;

        // Paused time auto-advances through the sleeps; the chain marches
        // forward from the scheduled dates, not the wall clock.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        runner.request_shutdown();

        let entries = log.snapshot();
        assert!(entries.len() >= 3, "expected at least 3 entries");
        for (i, entry) in entries.iter().take(3).enumerate() {
            assert_eq!(
                entry.next_fire_date,
                first_fire + chrono::Duration::seconds(i as i64)
            );
        }
        assert!(body.firings.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_body_still_reschedules() {
        let body = CountingBody::new(true);
        let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.register(RecurringJob {
            name: "flaky".to_string(),
            rule: Recurrence::every_seconds(1),
            body: Arc::clone(&body) as Arc<dyn RecurringJobBody>,
        });
        runner.start().unwrap();

        tokio::time::sleep(Duration::from_millis(4500)).await;
        runner.request_shutdown();

        assert!(body.firings.load(Ordering::SeqCst) >= 2);
        assert!(runner.schedule_log().len() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_chain_still_signals_completion() {
        let body = CountingBody::new(false);
        let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.register(RecurringJob {
            name: "once-only".to_string(),
            rule: Recurrence::cron("0 0 0 1 1 * 2027"),
            body: Arc::clone(&body) as Arc<dyn RecurringJobBody>,
        });
        runner.start().unwrap();

        // The rule fires once and can never fire again; the chain disables
        // itself, and the runner must still drain to completion afterwards.
        tokio::time::sleep(Duration::from_secs(2 * 365 * 24 * 3600)).await;
        assert_eq!(body.firings.load(Ordering::SeqCst), 1);

        runner.request_shutdown();
        tokio::time::timeout(Duration::from_secs(60), runner.wait_complete())
            .await
            .expect("runner never signaled completion");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_chain_at_next_firing() {
        let body = CountingBody::new(false);
        let mut runner = ScheduledJobRunner::new(ScheduledRunnerConfig::default());
        runner.register(RecurringJob {
            name: "steady".to_string(),
            rule: Recurrence::every_seconds(60),
            body: Arc::clone(&body) as Arc<dyn RecurringJobBody>,
        });
        runner.start().unwrap();

        runner.request_shutdown();
        runner.wait_complete().await;

        // The drain was requested before the first firing, so the body
        // never ran.
        assert_eq!(body.firings.load(Ordering::SeqCst), 0);
    }
}
