use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

#[cfg(test)]
use mockall::automock;

use super::error::{parse_payload, DeviceError};
use crate::config::DeviceServiceConfig;
use crate::observability::device_metrics;

/// Booking contract of the device service
///
/// Each call returns the device service's success payload or a
/// `DeviceError` telling transport failures apart from explicit rejections.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceOperations: Send + Sync {
    /// Reserve `device_id` exclusively for `workflow_id`
    async fn book(&self, device_id: &str, workflow_id: &str) -> Result<Value, DeviceError>;

    /// Release `device_id`; only honored for the workflow holding it
    async fn release(&self, device_id: &str, workflow_id: &str) -> Result<Value, DeviceError>;

    /// Run one operation on a device booked by `workflow_id`
    async fn execute(
        &self,
        device_id: &str,
        workflow_id: &str,
        operation: &str,
    ) -> Result<Value, DeviceError>;
}

#[derive(Debug, Serialize)]
struct ReservationRequest<'a> {
    workflow_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    workflow_id: &'a str,
    operation: &'a str,
}

/// HTTP client for the device service
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpDeviceClient {
    pub fn new(config: &DeviceServiceConfig) -> Result<Self, DeviceError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::transport(format!("Failed to create HTTP client: {e}")))?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DeviceError::transport(format!("Invalid device service URL {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DeviceError::transport(format!(
                "Device service URL {} cannot be a base URL",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/devices/{device_id}/{action}` with `device_id` as one
    /// percent-encoded path segment
    fn device_url(&self, device_id: &str, action: &str) -> Result<Url, DeviceError> {
        if matches!(device_id, "" | "." | "..") {
            return Err(DeviceError::InvalidDeviceId {
                device_id: device_id.to_string(),
            });
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DeviceError::transport("Device service URL cannot be a base URL"))?
            .pop_if_empty()
            .extend(["devices", device_id, action]);
        Ok(url)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: Url,
        workflow_id: &str,
        body: &B,
    ) -> Result<Value, DeviceError> {
        device_metrics().record_request();
        debug!(workflow_id = %workflow_id, "Sending device request to {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                device_metrics().record_transport_error();
                if e.is_timeout() {
                    warn!(
                        workflow_id = %workflow_id,
                        "Device request timed out after {:?}",
                        self.timeout
                    );
                    DeviceError::transport(format!("request timed out after {:?}", self.timeout))
                } else {
                    error!(workflow_id = %workflow_id, error = %e, "Error communicating with device service");
                    DeviceError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            device_metrics().record_transport_error();
            DeviceError::transport(format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            device_metrics().record_rejection(status.as_u16());
            error!(
                workflow_id = %workflow_id,
                status = %status,
                body = %String::from_utf8_lossy(&body),
                "Device service returned error"
            );
            return Err(DeviceError::Rejected {
                status: status.as_u16(),
                payload: parse_payload(&body),
            });
        }

        Ok(parse_payload(&body))
    }
}

#[async_trait]
impl DeviceOperations for HttpDeviceClient {
    async fn book(&self, device_id: &str, workflow_id: &str) -> Result<Value, DeviceError> {
        let url = self.device_url(device_id, "book")?;
        self.post(url, workflow_id, &ReservationRequest { workflow_id })
            .await
    }

    async fn release(&self, device_id: &str, workflow_id: &str) -> Result<Value, DeviceError> {
        let url = self.device_url(device_id, "release")?;
        self.post(url, workflow_id, &ReservationRequest { workflow_id })
            .await
    }

    async fn execute(
        &self,
        device_id: &str,
        workflow_id: &str,
        operation: &str,
    ) -> Result<Value, DeviceError> {
        let url = self.device_url(device_id, "execute")?;
        self.post(
            url,
            workflow_id,
            &ExecuteRequest {
                workflow_id,
                operation,
            },
        )
        .await
    }
}
