// Labflow Library - lab workflow coordination over a device booking service
// This exposes the core components for testing and integration

pub mod api;
pub mod config;
pub mod device;
pub mod observability;
pub mod server;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use api::{build_app, ApiError, AppState};
pub use config::LabflowConfig;
pub use device::{DeviceError, DeviceOperations, HttpDeviceClient};
pub use observability::{device_metrics, DeviceCallMetrics, OperationTimer};
pub use shutdown::ShutdownCoordinator;
pub use store::{InMemoryStateStore, RedisStateStore, StateStore, StoreError};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflows::{
    NewWorkflow, StepResult, Workflow, WorkflowCoordinator, WorkflowError, WorkflowRepository,
    WorkflowStatus, WorkflowUpdate,
};
