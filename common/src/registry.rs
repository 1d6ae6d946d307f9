// Job-type registry: maps a record's job name to executable behavior

use crate::errors::ExecutionError;
use crate::models::JobRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Execution context handed to a job type on every attempt
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Logical queue name the record was dequeued from
    pub queue: String,
    /// Derived persistence key for that queue
    pub storage_key: String,
}

/// Executable behavior selected by `JobRecord::job_name`
#[async_trait]
pub trait ExecutableJob: Send + Sync {
    /// Execute one dequeued record. Errors are retried up to the record's
    /// budget.
    async fn dequeue(&self, context: &JobContext, record: &JobRecord)
        -> Result<(), ExecutionError>;

    /// Called once with the final error after the retry budget is
    /// exhausted. Not called on success. A hook failure is logged by the
    /// worker, never escalated.
    async fn on_error(
        &self,
        _context: &JobContext,
        _error: &ExecutionError,
        _record: &JobRecord,
    ) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Registry of named job types consulted by the poll worker
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Arc<dyn ExecutableJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, job: Arc<dyn ExecutableJob>) {
        let name = name.into();
        if self.jobs.insert(name.clone(), job).is_some() {
            warn!(job_name = %name, "Replacing previously registered job type");
        } else {
            info!(job_name = %name, "Registered job type");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ExecutableJob>> {
        self.jobs.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
