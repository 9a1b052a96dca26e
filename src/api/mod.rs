//! HTTP surface of the workflow service
//!
//! Routes:
//! - `GET /health`
//! - `GET /workflows`, `POST /workflows`
//! - `GET /workflows/{workflow_id}`
//! - `POST /workflows/{workflow_id}/start`
//! - `POST /workflows/{workflow_id}/complete`
//! - `POST /workflows/{workflow_id}/execute-step`

pub mod error;
pub mod handlers;

pub use error::ApiError;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::workflows::WorkflowCoordinator;

/// Shared state handed to every handler
#[derive(Debug)]
pub struct AppState {
    pub coordinator: WorkflowCoordinator,
}

impl AppState {
    pub fn new(coordinator: WorkflowCoordinator) -> Arc<Self> {
        Arc::new(Self { coordinator })
    }
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
}

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/workflows",
            get(handlers::list_workflows).post(handlers::create_workflow),
        )
        .route("/workflows/{workflow_id}", get(handlers::get_workflow))
        .route(
            "/workflows/{workflow_id}/start",
            post(handlers::start_workflow),
        )
        .route(
            "/workflows/{workflow_id}/complete",
            post(handlers::complete_workflow),
        )
        .route(
            "/workflows/{workflow_id}/execute-step",
            post(handlers::execute_step),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state)
}
