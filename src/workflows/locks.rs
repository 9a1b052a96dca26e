use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-workflow exclusive locks.
///
/// Held across a whole coordinator operation, remote call included, so a
/// second caller for the same workflow only sees the committed result.
/// An entry lives only while some caller holds or waits for it.
#[derive(Debug, Default)]
pub struct WorkflowLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl WorkflowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn acquire(&self, workflow_id: &str) -> WorkflowLockGuard<'_> {
        let lock = self
            .table()
            .entry(workflow_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        WorkflowLockGuard {
            locks: self,
            workflow_id: workflow_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of workflow ids with a live entry
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the workflow lock on drop and forgets the entry once unused
#[derive(Debug)]
pub struct WorkflowLockGuard<'a> {
    locks: &'a WorkflowLocks,
    workflow_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WorkflowLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // The table holds one reference; any other is a holder or waiter.
        let mut table = self.locks.table();
        if table
            .get(&self.workflow_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.workflow_id);
        }
    }
}
