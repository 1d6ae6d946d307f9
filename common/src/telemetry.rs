// Telemetry module for structured logging and metric registration

use anyhow::Result;
use metrics::{describe_counter, Unit};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging with JSON formatting
///
/// Log levels come from `RUST_LOG` when set, otherwise from the
/// configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level, "Structured logging initialized");
    Ok(())
}

/// Register descriptions for every counter the engine emits
pub fn describe_metrics() {
    describe_counter!(
        "poll_ticks_total",
        Unit::Count,
        "Poll worker ticks, per queue"
    );
    describe_counter!(
        "jobs_dequeued_total",
        Unit::Count,
        "Records claimed from the store, per queue"
    );
    describe_counter!(
        "jobs_delayed_total",
        Unit::Count,
        "Records requeued by delay-gating, per queue"
    );
    describe_counter!("jobs_retried_total", Unit::Count, "Failed attempts retried");
    describe_counter!(
        "jobs_exhausted_total",
        Unit::Count,
        "Jobs that failed after exhausting their retry budget"
    );
    describe_counter!(
        "jobs_unregistered_total",
        Unit::Count,
        "Dequeued records naming an unregistered job type"
    );
    describe_counter!(
        "recurring_firings_total",
        Unit::Count,
        "Recurring job firings, per job"
    );
    describe_counter!(
        "schedules_disabled_total",
        Unit::Count,
        "Recurring jobs permanently disabled by unsatisfiable rules"
    );
}
