// Workflow lifecycle: domain types, persistence and coordination

pub mod coordinator;
pub mod error;
pub mod locks;
pub mod repository;
pub mod types;

pub use coordinator::WorkflowCoordinator;
pub use error::{DeviceCall, WorkflowError};
pub use repository::WorkflowRepository;
pub use types::{
    NewWorkflow, StepResult, Workflow, WorkflowCollection, WorkflowStatus, WorkflowUpdate,
};
