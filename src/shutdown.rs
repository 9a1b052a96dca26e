use tracing::{info, warn};

/// Graceful shutdown coordination for the HTTP server
pub struct ShutdownCoordinator {}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {}
    }

    /// Resolve once SIGINT or SIGTERM is received.
    ///
    /// Passed to `axum::serve(..).with_graceful_shutdown` so in-flight
    /// requests finish before the listener closes.
    pub async fn wait_for_shutdown(self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        info!("Shutdown coordinator ready - will shutdown gracefully on SIGINT/SIGTERM");

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT"),
            _ = terminate => info!("Received SIGTERM"),
        }

        info!("Initiating graceful shutdown...");
    }

    /// Final bookkeeping once the server has stopped accepting requests
    pub fn finish() {
        crate::observability::device_metrics().log_stats();
        info!("Graceful shutdown completed successfully");
    }
}
