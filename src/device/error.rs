use serde_json::Value;
use thiserror::Error;

/// Failure of a single device service call
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// The request never produced a response (connect failure, timeout, reset)
    #[error("Failed to communicate with device service: {message}")]
    Transport { message: String },

    /// The device service answered with a non-success status
    #[error("Device service rejected request with status {status}")]
    Rejected { status: u16, payload: Value },

    /// The device id cannot be expressed as a single URL path segment
    #[error("Device id {device_id:?} is not addressable")]
    InvalidDeviceId { device_id: String },
}

impl DeviceError {
    pub fn transport(message: impl Into<String>) -> Self {
        DeviceError::Transport {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DeviceError::Transport { .. })
    }
}

/// Parse a response body as JSON, degrading to an empty object.
///
/// Device service bodies are informational; a malformed one must never fail
/// the caller's request.
pub fn parse_payload(body: &[u8]) -> Value {
    serde_json::from_slice::<Value>(body).unwrap_or_else(|_| Value::Object(Default::default()))
}
