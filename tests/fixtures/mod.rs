//! Shared fixtures for workflow service integration tests
//!
//! Provides a recording fake of the device service, a store that always
//! fails, and helpers for driving the router in-process.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use labflow::{
    build_app, AppState, DeviceError, DeviceOperations, InMemoryStateStore, StateStore,
    StoreError, WorkflowCoordinator, WorkflowRepository,
};

/// One call received by the fake device service
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCallRecord {
    pub action: String,
    pub device_id: String,
    pub workflow_id: String,
    pub operation: Option<String>,
}

/// Device service fake that records every call.
///
/// Succeeds by default; individual actions can be made to fail and
/// booking can be slowed down to widen race windows.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCallRecord>>,
    failures: Mutex<HashMap<String, DeviceError>>,
    book_delay: Option<Duration>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book_delay(delay: Duration) -> Self {
        Self {
            book_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make every future `action` call fail with `error`
    pub fn fail(&self, action: &str, error: DeviceError) {
        self.failures
            .lock()
            .unwrap()
            .insert(action.to_string(), error);
    }

    pub fn reject(&self, action: &str, status: u16, payload: Value) {
        self.fail(action, DeviceError::Rejected { status, payload });
    }

    pub fn calls(&self) -> Vec<DeviceCallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, action: &str) -> Vec<DeviceCallRecord> {
        self.calls()
            .into_iter()
            .filter(|call| call.action == action)
            .collect()
    }

    fn record(
        &self,
        action: &str,
        device_id: &str,
        workflow_id: &str,
        operation: Option<&str>,
    ) -> Result<Value, DeviceError> {
        self.calls.lock().unwrap().push(DeviceCallRecord {
            action: action.to_string(),
            device_id: device_id.to_string(),
            workflow_id: workflow_id.to_string(),
            operation: operation.map(str::to_string),
        });

        if let Some(error) = self.failures.lock().unwrap().get(action) {
            return Err(error.clone());
        }
        Ok(json!({
            "message": format!("{action} ok"),
            "device_id": device_id,
            "workflow_id": workflow_id,
        }))
    }
}

#[async_trait]
impl DeviceOperations for RecordingDevice {
    async fn book(&self, device_id: &str, workflow_id: &str) -> Result<Value, DeviceError> {
        if let Some(delay) = self.book_delay {
            tokio::time::sleep(delay).await;
        }
        self.record("book", device_id, workflow_id, None)
    }

    async fn release(&self, device_id: &str, workflow_id: &str) -> Result<Value, DeviceError> {
        self.record("release", device_id, workflow_id, None)
    }

    async fn execute(
        &self,
        device_id: &str,
        workflow_id: &str,
        operation: &str,
    ) -> Result<Value, DeviceError> {
        self.record("execute", device_id, workflow_id, Some(operation))?;
        Ok(json!({ "operation": operation, "status": "done" }))
    }
}

/// State store whose every call fails
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl StateStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

pub fn app_with_store(store: Arc<dyn StateStore>, device: Arc<RecordingDevice>) -> Router {
    let repository = WorkflowRepository::new(store, "workflows");
    build_app(AppState::new(WorkflowCoordinator::new(repository, device)))
}

/// Router over an in-memory store and the given fake device
pub fn test_app(device: Arc<RecordingDevice>) -> Router {
    app_with_store(Arc::new(InMemoryStateStore::new()), device)
}

/// Send one request through the router and decode the JSON response
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    send_raw(app, method, uri, body).await
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub fn pcr_run() -> Value {
    json!({
        "name": "PCR Run",
        "device_id": "liquid-handler-1",
        "sample_barcodes": ["S-001", "S-002"],
        "steps": ["pipette", "heat"],
    })
}

/// Create a workflow and return its id
pub async fn create_workflow(app: &Router, body: Value) -> String {
    let (status, workflow) = send(app, Method::POST, "/workflows", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {workflow}");
    workflow["id"].as_str().unwrap().to_string()
}
