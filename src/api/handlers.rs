use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::{ApiError, AppState};
use crate::workflows::NewWorkflow;

pub async fn health() -> Response {
    Json(json!({ "status": "healthy", "service": "workflow-service" })).into_response()
}

pub async fn list_workflows(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let workflows = state.coordinator.list().await?;
    Ok(Json(workflows).into_response())
}

pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Response, ApiError> {
    let workflow = state.coordinator.get(&workflow_id).await?;
    Ok(Json(workflow).into_response())
}

pub async fn create_workflow(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewWorkflow>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected workflow creation body");
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "name and device_id are required" })),
            )
                .into_response());
        }
    };

    let workflow = state.coordinator.create(request).await?;
    Ok((StatusCode::CREATED, Json(workflow)).into_response())
}

pub async fn start_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Response, ApiError> {
    let workflow = state.coordinator.start(&workflow_id).await?;
    Ok(Json(workflow).into_response())
}

pub async fn complete_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Response, ApiError> {
    let workflow = state.coordinator.complete(&workflow_id).await?;
    Ok(Json(workflow).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteStepRequest {
    #[serde(default)]
    step_index: Option<i64>,
}

/// Missing, empty or malformed bodies all mean "run step 0"
fn parse_execute_request(workflow_id: &str, body: &[u8]) -> ExecuteStepRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return ExecuteStepRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!(workflow_id = %workflow_id, error = %e, "Unreadable execute-step body, using step 0");
        ExecuteStepRequest::default()
    })
}

pub async fn execute_step(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = parse_execute_request(&workflow_id, &body);
    let outcome = state
        .coordinator
        .execute_step(&workflow_id, request.step_index)
        .await?;
    Ok(Json(outcome).into_response())
}
