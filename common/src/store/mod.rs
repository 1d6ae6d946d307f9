// Job store client interface
//
// The store is an external collaborator: it hands out at most one
// in-flight record per poll and is safe under concurrent access from
// multiple worker processes. The core adds no locking around it.

pub mod memory;
pub mod redis;

pub use memory::MemoryJobStore;
pub use redis::RedisJobStore;

use crate::errors::StoreError;
use crate::models::JobRecord;
use async_trait::async_trait;

/// Keyed queue operations consumed by the poll worker
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Claim one candidate record at the key, or None when the queue is
    /// empty.
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Return an unexecuted record to the queue (delay-gating path).
    async fn requeue(&self, key: &str, record: &JobRecord) -> Result<(), StoreError>;

    /// Finalize a record that reached a terminal outcome.
    async fn completed(&self, key: &str, record: &JobRecord) -> Result<(), StoreError>;
}
