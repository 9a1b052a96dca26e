use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Device service call metrics
#[derive(Debug, Default)]
pub struct DeviceCallMetrics {
    pub total_requests: AtomicU64,
    pub rejections: AtomicU64,
    pub transport_errors: AtomicU64,
}

impl DeviceCallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, status: u16) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        warn!(status, "Device service rejected request");
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> DeviceCallStats {
        DeviceCallStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Device service metrics: requests={}, rejections={}, transport_errors={}",
            stats.total_requests, stats.rejections, stats.transport_errors
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCallStats {
    pub total_requests: u64,
    pub rejections: u64,
    pub transport_errors: u64,
}

/// Global metrics instance
static DEVICE_METRICS: std::sync::LazyLock<DeviceCallMetrics> =
    std::sync::LazyLock::new(DeviceCallMetrics::new);

pub fn device_metrics() -> &'static DeviceCallMetrics {
    &DEVICE_METRICS
}

/// Time an operation and log its duration.
///
/// `finish` logs a completed operation; a timer dropped without `finish`
/// (early return on error) logs a failed one.
pub struct OperationTimer {
    operation: String,
    start: Instant,
    completed: bool,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn finish(mut self) {
        self.completed = true;
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis();
        if self.completed {
            info!(operation = %self.operation, duration_ms, "Operation completed");
        } else {
            warn!(operation = %self.operation, duration_ms, "Operation failed");
        }
    }
}
