use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::error::WorkflowError;

/// Lifecycle status of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Created,
    Running,
    Completed,
    /// Reserved. No transition enters or leaves this state yet.
    Paused,
}

/// Every legal transition, as (from, to)
const TRANSITIONS: &[(WorkflowStatus, WorkflowStatus)] = &[
    (WorkflowStatus::Created, WorkflowStatus::Running),
    (WorkflowStatus::Running, WorkflowStatus::Completed),
];

impl WorkflowStatus {
    pub fn can_transition_to(self, next: WorkflowStatus) -> bool {
        TRANSITIONS.contains(&(self, next))
    }

    /// Check `self -> next` against the transition table.
    ///
    /// On failure the error names the status the transition requires.
    pub fn ensure_transition(self, next: WorkflowStatus) -> Result<(), WorkflowError> {
        match TRANSITIONS.iter().find(|(_, to)| *to == next) {
            Some((from, _)) if *from == self => Ok(()),
            Some((from, _)) => Err(WorkflowError::InvalidState {
                current: self,
                required: *from,
            }),
            None => Err(WorkflowError::Validation {
                reason: format!("no transition leads to {next}"),
            }),
        }
    }

    /// Operations that do not transition still require a given status
    pub fn ensure_status(self, required: WorkflowStatus) -> Result<(), WorkflowError> {
        if self == required {
            Ok(())
        } else {
            Err(WorkflowError::InvalidState {
                current: self,
                required,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Created => "created",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of orchestrated work bound to one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub device_id: String,
    #[serde(default)]
    pub sample_barcodes: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Operation name of the step at `index`, if any
    pub fn step(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// Timestamps agree with status: started iff running/completed,
    /// completed iff completed
    pub fn timestamps_consistent(&self) -> bool {
        let started_expected = matches!(
            self.status,
            WorkflowStatus::Running | WorkflowStatus::Completed
        );
        let completed_expected = self.status == WorkflowStatus::Completed;
        self.started_at.is_some() == started_expected
            && self.completed_at.is_some() == completed_expected
    }
}

/// The full persisted collection, keyed by workflow id
pub type WorkflowCollection = HashMap<String, Workflow>;

/// Input for creating a workflow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorkflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub sample_barcodes: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Named subset of fields merged into an existing workflow.
///
/// `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowUpdate {
    pub name: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowUpdate {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(WorkflowStatus::Running),
            started_at: Some(at),
            ..Default::default()
        }
    }

    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(WorkflowStatus::Completed),
            completed_at: Some(at),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, workflow: &mut Workflow) {
        if let Some(name) = &self.name {
            workflow.name = name.clone();
        }
        if let Some(status) = self.status {
            workflow.status = status;
        }
        if let Some(started_at) = self.started_at {
            workflow.started_at = Some(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            workflow.completed_at = Some(completed_at);
        }
    }
}

/// Outcome of executing one step on the bound device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub workflow_id: String,
    pub step_index: usize,
    pub step: String,
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_workflow() -> Workflow {
        Workflow {
            id: "wf-1".to_string(),
            name: "PCR Run".to_string(),
            device_id: "liquid-handler-1".to_string(),
            sample_barcodes: vec!["S-001".to_string()],
            steps: vec!["pipette".to_string(), "heat".to_string()],
            status: WorkflowStatus::Created,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_transition_table() {
        use WorkflowStatus::*;

        assert!(Created.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));

        assert!(!Created.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Running));
        for status in [Created, Running, Completed] {
            assert!(!status.can_transition_to(Paused));
            assert!(!Paused.can_transition_to(status));
        }
    }

    #[test]
    fn test_ensure_transition_names_required_status() {
        let err = WorkflowStatus::Completed
            .ensure_transition(WorkflowStatus::Running)
            .unwrap_err();
        match err {
            WorkflowError::InvalidState { current, required } => {
                assert_eq!(current, WorkflowStatus::Completed);
                assert_eq!(required, WorkflowStatus::Created);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_paused_is_never_a_transition_target() {
        assert!(matches!(
            WorkflowStatus::Running.ensure_transition(WorkflowStatus::Paused),
            Err(WorkflowError::Validation { .. })
        ));
    }

    #[test]
    fn test_ensure_status() {
        assert!(WorkflowStatus::Running
            .ensure_status(WorkflowStatus::Running)
            .is_ok());
        assert!(matches!(
            WorkflowStatus::Created.ensure_status(WorkflowStatus::Running),
            Err(WorkflowError::InvalidState {
                current: WorkflowStatus::Created,
                required: WorkflowStatus::Running,
            })
        ));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(WorkflowStatus::Paused).unwrap(),
            json!("paused")
        );
        let parsed: WorkflowStatus = serde_json::from_value(json!("running")).unwrap();
        assert_eq!(parsed, WorkflowStatus::Running);
    }

    #[test]
    fn test_unset_timestamps_are_omitted() {
        let value = serde_json::to_value(sample_workflow()).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("started_at"));
        assert!(!object.contains_key("completed_at"));
        assert_eq!(object["status"], json!("created"));
        assert_eq!(object["steps"], json!(["pipette", "heat"]));
    }

    #[test]
    fn test_update_leaves_unmentioned_fields() {
        let mut workflow = sample_workflow();
        let before = workflow.clone();
        let started = Utc::now();

        WorkflowUpdate::started(started).apply_to(&mut workflow);

        assert_eq!(workflow.status, WorkflowStatus::Running);
        assert_eq!(workflow.started_at, Some(started));
        assert_eq!(workflow.name, before.name);
        assert_eq!(workflow.steps, before.steps);
        assert_eq!(workflow.completed_at, None);
        assert!(workflow.timestamps_consistent());
    }

    #[test]
    fn test_rename_only_update() {
        let mut workflow = sample_workflow();
        WorkflowUpdate {
            name: Some("qPCR Run".to_string()),
            ..Default::default()
        }
        .apply_to(&mut workflow);

        assert_eq!(workflow.name, "qPCR Run");
        assert_eq!(workflow.status, WorkflowStatus::Created);
    }
}
