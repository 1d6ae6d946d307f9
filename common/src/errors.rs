// Error handling framework
// One enum per concern; per-tick and per-firing errors never crash the process.

use thiserror::Error;

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Invalid recurrence configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No next fire time satisfies the recurrence rule")]
    Unsatisfiable,
}

/// Job execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No job type registered under '{0}'")]
    UnregisteredJobType(String),

    #[error("Job execution failed: {0}")]
    JobFailed(String),

    #[error("Error hook failed: {0}")]
    HookFailed(String),
}

/// Job store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Failed to fetch record at '{key}': {reason}")]
    Get { key: String, reason: String },

    #[error("Failed to requeue record at '{key}': {reason}")]
    Requeue { key: String, reason: String },

    #[error("Failed to finalize record at '{key}': {reason}")]
    Complete { key: String, reason: String },

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Startup misconfiguration reported to the caller of `start()`
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("No queues configured for the poll worker")]
    NoQueuesConfigured,

    #[error("No recurring job produced a satisfiable schedule")]
    NoSatisfiableSchedules,
}
