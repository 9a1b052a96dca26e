use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_app, AppState};
use crate::config::{LabflowConfig, StoreBackend, StoreConfig};
use crate::device::HttpDeviceClient;
use crate::shutdown::ShutdownCoordinator;
use crate::store::{InMemoryStateStore, RedisStateStore, StateStore};
use crate::workflows::{WorkflowCoordinator, WorkflowRepository};

/// Open the configured state store.
///
/// Redis connectivity is checked up front so a bad URL fails at startup.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn StateStore>> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisStateStore::new(config)
                .with_context(|| format!("Failed to create Redis pool for {}", config.redis_url))?;
            store
                .verify_connection(&config.collection_key)
                .await
                .context("Redis is unreachable")?;
            info!(url = %config.redis_url, "Connected to Redis state store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory state store; workflows are lost on restart");
            Ok(Arc::new(InMemoryStateStore::new()))
        }
    }
}

/// Wire store, device client and coordinator into shared API state
pub async fn build_state(config: &LabflowConfig) -> Result<Arc<AppState>> {
    let store = build_store(&config.store).await?;
    let devices = HttpDeviceClient::new(&config.device_service)
        .context("Failed to create device service client")?;
    info!(base_url = %devices.base_url(), "Device service client ready");

    let repository = WorkflowRepository::new(store, config.store.collection_key.clone());
    let coordinator = WorkflowCoordinator::new(repository, Arc::new(devices));
    Ok(AppState::new(coordinator))
}

/// Serve the workflow API until SIGINT/SIGTERM
pub async fn run(config: &LabflowConfig) -> Result<()> {
    let state = build_state(config).await?;
    let app = build_app(state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Workflow service listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(ShutdownCoordinator::new().wait_for_shutdown())
        .await
        .context("HTTP server error")?;

    ShutdownCoordinator::finish();
    Ok(())
}
