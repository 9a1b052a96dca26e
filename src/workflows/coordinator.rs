// Workflow lifecycle coordination
// Device calls happen before any status change is committed; a failed call
// leaves the stored workflow exactly as it was.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::error::{DeviceCall, WorkflowError};
use super::locks::WorkflowLocks;
use super::repository::WorkflowRepository;
use super::types::{NewWorkflow, StepResult, Workflow, WorkflowStatus, WorkflowUpdate};
use crate::device::DeviceOperations;
use crate::observability::OperationTimer;
use crate::telemetry::{create_workflow_span, generate_correlation_id};

/// Drives workflows through created -> running -> completed.
///
/// Start, Complete and ExecuteStep hold a per-workflow lock for their whole
/// duration, so concurrent callers on the same workflow are serialized and a
/// device is booked at most once per workflow.
pub struct WorkflowCoordinator {
    repository: WorkflowRepository,
    devices: Arc<dyn DeviceOperations>,
    locks: WorkflowLocks,
}

impl std::fmt::Debug for WorkflowCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowCoordinator")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl WorkflowCoordinator {
    pub fn new(repository: WorkflowRepository, devices: Arc<dyn DeviceOperations>) -> Self {
        Self {
            repository,
            devices,
            locks: WorkflowLocks::new(),
        }
    }

    /// All workflows, oldest first (ties broken by id)
    pub async fn list(&self) -> Result<Vec<Workflow>, WorkflowError> {
        let mut workflows: Vec<Workflow> = self.repository.get_all().await?.into_values().collect();
        workflows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(workflows)
    }

    pub async fn get(&self, workflow_id: &str) -> Result<Workflow, WorkflowError> {
        self.repository
            .get(workflow_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(workflow_id))
    }

    pub async fn create(&self, request: NewWorkflow) -> Result<Workflow, WorkflowError> {
        if request.name.trim().is_empty() || request.device_id.trim().is_empty() {
            return Err(WorkflowError::Validation {
                reason: "name and device_id are required".to_string(),
            });
        }

        let workflow_id = Uuid::new_v4().to_string();
        let span = create_workflow_span("create", Some(&workflow_id), &generate_correlation_id());
        self.create_with_id(workflow_id, request)
            .instrument(span)
            .await
    }

    /// Book the bound device, then mark the workflow running
    pub async fn start(&self, workflow_id: &str) -> Result<Workflow, WorkflowError> {
        let span = create_workflow_span("start", Some(workflow_id), &generate_correlation_id());
        self.start_locked(workflow_id).instrument(span).await
    }

    /// Release the bound device, then mark the workflow completed
    pub async fn complete(&self, workflow_id: &str) -> Result<Workflow, WorkflowError> {
        let span = create_workflow_span("complete", Some(workflow_id), &generate_correlation_id());
        self.complete_locked(workflow_id).instrument(span).await
    }

    /// Run one step on the bound device.
    ///
    /// `step_index` defaults to 0. The workflow itself is never modified, and
    /// nothing records which steps already ran: executing an index twice runs
    /// it twice.
    pub async fn execute_step(
        &self,
        workflow_id: &str,
        step_index: Option<i64>,
    ) -> Result<StepResult, WorkflowError> {
        let span = create_workflow_span("execute_step", Some(workflow_id), &generate_correlation_id());
        self.execute_step_locked(workflow_id, step_index.unwrap_or(0))
            .instrument(span)
            .await
    }

    async fn create_with_id(
        &self,
        workflow_id: String,
        request: NewWorkflow,
    ) -> Result<Workflow, WorkflowError> {
        info!(
            name = %request.name,
            device_id = %request.device_id,
            steps = request.steps.len(),
            "Creating workflow"
        );

        let workflow = Workflow {
            id: workflow_id.clone(),
            name: request.name,
            device_id: request.device_id,
            sample_barcodes: request.sample_barcodes,
            steps: request.steps,
            status: WorkflowStatus::Created,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.repository.put(workflow).await?;

        let stored = self.get(&workflow_id).await?;
        info!("Workflow created successfully");
        Ok(stored)
    }

    async fn start_locked(&self, workflow_id: &str) -> Result<Workflow, WorkflowError> {
        let timer = OperationTimer::new("workflow_start");
        let _guard = self.locks.acquire(workflow_id).await;

        let workflow = self.get(workflow_id).await?;
        if let Err(e) = workflow.status.ensure_transition(WorkflowStatus::Running) {
            warn!(status = %workflow.status, "Workflow already started or completed");
            return Err(e);
        }

        info!(device_id = %workflow.device_id, "Booking device");
        self.devices
            .book(&workflow.device_id, workflow_id)
            .await
            .map_err(|e| WorkflowError::from_device(DeviceCall::Book, e))?;

        let started = self
            .commit_transition(
                workflow_id,
                WorkflowStatus::Running,
                WorkflowUpdate::started(Utc::now()),
            )
            .await?;
        info!("Workflow started successfully");
        timer.finish();
        Ok(started)
    }

    async fn complete_locked(&self, workflow_id: &str) -> Result<Workflow, WorkflowError> {
        let timer = OperationTimer::new("workflow_complete");
        let _guard = self.locks.acquire(workflow_id).await;

        let workflow = self.get(workflow_id).await?;
        if let Err(e) = workflow.status.ensure_transition(WorkflowStatus::Completed) {
            warn!(status = %workflow.status, "Workflow is not running");
            return Err(e);
        }

        info!(device_id = %workflow.device_id, "Releasing device");
        self.devices
            .release(&workflow.device_id, workflow_id)
            .await
            .map_err(|e| WorkflowError::from_device(DeviceCall::Release, e))?;

        let completed = self
            .commit_transition(
                workflow_id,
                WorkflowStatus::Completed,
                WorkflowUpdate::completed(Utc::now()),
            )
            .await?;
        info!("Workflow completed successfully");
        timer.finish();
        Ok(completed)
    }

    async fn execute_step_locked(
        &self,
        workflow_id: &str,
        requested: i64,
    ) -> Result<StepResult, WorkflowError> {
        let timer = OperationTimer::new("workflow_execute_step");
        let _guard = self.locks.acquire(workflow_id).await;

        let workflow = self.get(workflow_id).await?;
        let Some((index, step)) = usize::try_from(requested)
            .ok()
            .and_then(|i| workflow.step(i).map(|step| (i, step.to_string())))
        else {
            warn!(step_index = requested, steps = workflow.steps.len(), "Invalid step index");
            return Err(WorkflowError::Index {
                index: requested,
                step_count: workflow.steps.len(),
            });
        };
        workflow.status.ensure_status(WorkflowStatus::Running)?;

        info!(step_index = index, step = %step, device_id = %workflow.device_id, "Executing step");
        let result = self
            .devices
            .execute(&workflow.device_id, workflow_id, &step)
            .await
            .map_err(|e| WorkflowError::from_device(DeviceCall::Execute, e))?;

        timer.finish();
        Ok(StepResult {
            workflow_id: workflow_id.to_string(),
            step_index: index,
            step,
            result,
        })
    }

    /// Re-read the stored status, apply `update` if `target` is still a legal
    /// next state, and return the freshly persisted record.
    async fn commit_transition(
        &self,
        workflow_id: &str,
        target: WorkflowStatus,
        update: WorkflowUpdate,
    ) -> Result<Workflow, WorkflowError> {
        let current = self.get(workflow_id).await?;
        current.status.ensure_transition(target)?;

        self.repository
            .apply_update(workflow_id, &update)
            .await?
            .ok_or_else(|| WorkflowError::not_found(workflow_id))?;
        self.get(workflow_id).await
    }
}
