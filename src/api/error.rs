use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::workflows::{WorkflowError, WorkflowStatus};

/// Maps coordinator errors onto HTTP responses
#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError(err)
    }
}

/// Device rejections keep the device service's status code when it is an
/// error status; anything else becomes 502
fn remote_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() || code.is_server_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn rejection(status: u16, message: &str, payload: Value) -> (StatusCode, Value) {
    (
        remote_status(status),
        json!({ "error": message, "details": payload }),
    )
}

impl ApiError {
    pub fn status_and_body(self) -> (StatusCode, Value) {
        match self.0 {
            WorkflowError::Validation { reason } => {
                (StatusCode::BAD_REQUEST, json!({ "error": reason }))
            }
            WorkflowError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Workflow not found" }),
            ),
            WorkflowError::InvalidState { required, .. } => {
                let message = match required {
                    WorkflowStatus::Created => "Workflow already started or completed",
                    WorkflowStatus::Running => "Workflow is not running",
                    _ => "Workflow is not in a valid state for this operation",
                };
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            WorkflowError::Index { .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid step index" }),
            ),
            WorkflowError::Dependency { message } => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": format!("Failed to communicate with device service: {message}")
                }),
            ),
            WorkflowError::BookingRejected { status, payload } => {
                rejection(status, "Failed to book device", payload)
            }
            WorkflowError::ReleaseRejected { status, payload } => {
                rejection(status, "Failed to release device", payload)
            }
            WorkflowError::ExecutionRejected { status, payload } => {
                rejection(status, "Failed to execute step", payload)
            }
            WorkflowError::Storage(e) => {
                error!(error = %e, "Workflow store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to access workflow store" }),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
