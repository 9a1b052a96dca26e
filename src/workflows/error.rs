use serde_json::Value;
use thiserror::Error;

use super::types::WorkflowStatus;
use crate::device::DeviceError;
use crate::store::StoreError;

/// Errors surfaced by workflow coordination
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Workflow not found: {workflow_id}")]
    NotFound { workflow_id: String },

    #[error("Invalid state: workflow is {current}, operation requires {required}")]
    InvalidState {
        current: WorkflowStatus,
        required: WorkflowStatus,
    },

    #[error("Invalid step index {index}: workflow has {step_count} steps")]
    Index { index: i64, step_count: usize },

    #[error("Failed to communicate with device service: {message}")]
    Dependency { message: String },

    #[error("Device service rejected booking with status {status}")]
    BookingRejected { status: u16, payload: Value },

    #[error("Device service rejected release with status {status}")]
    ReleaseRejected { status: u16, payload: Value },

    #[error("Device service rejected step execution with status {status}")]
    ExecutionRejected { status: u16, payload: Value },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Which device call a failure came from; picks the rejection variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Book,
    Release,
    Execute,
}

impl WorkflowError {
    pub fn not_found(workflow_id: &str) -> Self {
        WorkflowError::NotFound {
            workflow_id: workflow_id.to_string(),
        }
    }

    pub fn from_device(call: DeviceCall, err: DeviceError) -> Self {
        match err {
            DeviceError::Transport { message } => WorkflowError::Dependency { message },
            DeviceError::InvalidDeviceId { device_id } => WorkflowError::Validation {
                reason: format!("device_id {device_id:?} is not a valid device identifier"),
            },
            DeviceError::Rejected { status, payload } => match call {
                DeviceCall::Book => WorkflowError::BookingRejected { status, payload },
                DeviceCall::Release => WorkflowError::ReleaseRejected { status, payload },
                DeviceCall::Execute => WorkflowError::ExecutionRejected { status, payload },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejections_map_by_call() {
        let rejected = || DeviceError::Rejected {
            status: 409,
            payload: json!({"error": "Device is not available"}),
        };

        assert!(matches!(
            WorkflowError::from_device(DeviceCall::Book, rejected()),
            WorkflowError::BookingRejected { status: 409, .. }
        ));
        assert!(matches!(
            WorkflowError::from_device(DeviceCall::Release, rejected()),
            WorkflowError::ReleaseRejected { status: 409, .. }
        ));
        assert!(matches!(
            WorkflowError::from_device(DeviceCall::Execute, rejected()),
            WorkflowError::ExecutionRejected { status: 409, .. }
        ));
    }

    #[test]
    fn test_unaddressable_device_is_a_validation_error() {
        let err = WorkflowError::from_device(
            DeviceCall::Book,
            DeviceError::InvalidDeviceId {
                device_id: "..".to_string(),
            },
        );
        assert!(matches!(err, WorkflowError::Validation { .. }));
    }

    #[test]
    fn test_transport_maps_to_dependency_for_every_call() {
        for call in [DeviceCall::Book, DeviceCall::Release, DeviceCall::Execute] {
            let err = WorkflowError::from_device(call, DeviceError::transport("refused"));
            assert!(matches!(err, WorkflowError::Dependency { .. }));
        }
    }
}
