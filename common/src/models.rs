// Data model shared across the poll worker and the scheduled job runner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JobRecord is one persisted unit of work.
///
/// Created by the enqueuing side, read and requeued by the poll worker,
/// removed from the queue only through `completed`. The retry budget is
/// carried on the record itself and restarts on every fresh dequeue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Opaque identity assigned by the enqueuing side
    pub id: String,
    /// Selects executable behavior via the job-type registry
    pub job_name: String,
    /// Remaining-attempts budget at dequeue time (total attempts = budget + 1)
    pub max_retry_count: u32,
    /// The record is not eligible for execution before this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_until: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(
        id: impl Into<String>,
        job_name: impl Into<String>,
        max_retry_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            job_name: job_name.into(),
            max_retry_count,
            delay_until: None,
        }
    }

    pub fn with_delay(mut self, delay_until: DateTime<Utc>) -> Self {
        self.delay_until = Some(delay_until);
        self
    }

    /// A delayed record must go back to the store unexecuted.
    pub fn is_delayed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.delay_until, Some(until) if until > now)
    }
}

/// One row of the scheduled-job firing log: the freshly computed next fire
/// date for a recurring job, appended each time a timer is armed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJobEntry {
    pub job_name: String,
    pub next_fire_date: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

/// Derive the well-known persistence key for a queue's logical name.
pub fn storage_key(prefix: &str, queue: &str) -> String {
    format!("{}:queue:{}", prefix, queue)
}
