// In-memory job store
//
// Test double for the keyed queue: FIFO per key, with inspection helpers
// so tests can assert on queued and finalized records.

use crate::errors::StoreError;
use crate::models::JobRecord;
use crate::store::JobStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryJobStore {
    queues: Mutex<HashMap<String, VecDeque<JobRecord>>>,
    finalized: Mutex<HashMap<String, Vec<JobRecord>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, the way the out-of-scope enqueuing side would.
    pub fn push(&self, key: &str, record: JobRecord) {
        self.queues
            .lock()
            .expect("queue mutex poisoned")
            .entry(key.to_string())
            .or_default()
            .push_back(record);
    }

    pub fn queued(&self, key: &str) -> Vec<JobRecord> {
        self.queues
            .lock()
            .expect("queue mutex poisoned")
            .get(key)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn completed_records(&self, key: &str) -> Vec<JobRecord> {
        self.finalized
            .lock()
            .expect("finalized mutex poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self
            .queues
            .lock()
            .expect("queue mutex poisoned")
            .get_mut(key)
            .and_then(|q| q.pop_front()))
    }

    async fn requeue(&self, key: &str, record: &JobRecord) -> Result<(), StoreError> {
        self.push(key, record.clone());
        Ok(())
    }

    async fn completed(&self, key: &str, record: &JobRecord) -> Result<(), StoreError> {
        self.finalized
            .lock()
            .expect("finalized mutex poisoned")
            .entry(key.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}
