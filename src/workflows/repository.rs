use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::types::{Workflow, WorkflowCollection, WorkflowUpdate};
use crate::store::{StateStore, StoreError};

/// Read-modify-write accessor over the workflow collection blob.
///
/// Every write reads the full collection, changes one entry and writes the
/// full collection back. Writers are serialized by an in-process mutex so
/// concurrent writes to different workflows cannot clobber each other.
#[derive(Clone)]
pub struct WorkflowRepository {
    store: Arc<dyn StateStore>,
    collection_key: String,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for WorkflowRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRepository")
            .field("backend", &self.store.backend_name())
            .field("collection_key", &self.collection_key)
            .finish()
    }
}

impl WorkflowRepository {
    pub fn new(store: Arc<dyn StateStore>, collection_key: impl Into<String>) -> Self {
        Self {
            store,
            collection_key: collection_key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Whole collection; a missing blob is an empty collection
    pub async fn get_all(&self) -> Result<WorkflowCollection, StoreError> {
        match self.store.get(&self.collection_key).await? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(WorkflowCollection::new()),
        }
    }

    async fn save_all(&self, workflows: &WorkflowCollection) -> Result<(), StoreError> {
        let blob = serde_json::to_string(workflows)?;
        self.store.set(&self.collection_key, blob).await
    }

    pub async fn get(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        let mut workflows = self.get_all().await?;
        Ok(workflows.remove(workflow_id))
    }

    /// Insert or replace a workflow by id
    pub async fn put(&self, workflow: Workflow) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut workflows = self.get_all().await?;
        debug!(workflow_id = %workflow.id, total = workflows.len(), "Upserting workflow");
        workflows.insert(workflow.id.clone(), workflow);
        self.save_all(&workflows).await
    }

    /// Merge `update` into the stored workflow; `None` if no such workflow
    pub async fn apply_update(
        &self,
        workflow_id: &str,
        update: &WorkflowUpdate,
    ) -> Result<Option<Workflow>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut workflows = self.get_all().await?;
        let Some(workflow) = workflows.get_mut(workflow_id) else {
            return Ok(None);
        };
        update.apply_to(workflow);
        let updated = workflow.clone();

        self.save_all(&workflows).await?;
        debug!(workflow_id = %workflow_id, status = %updated.status, "Applied workflow update");
        Ok(Some(updated))
    }
}
