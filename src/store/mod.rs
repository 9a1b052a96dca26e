//! Key-value blob storage for the workflow collection
//!
//! The coordinator persists its whole workflow collection as one serialized
//! blob under a fixed key. This module provides the storage seam and its
//! backends:
//! - `RedisStateStore` for deployments (pooled connections)
//! - `InMemoryStateStore` for tests and local runs

pub mod memory;
pub mod redis;

pub use memory::InMemoryStateStore;
pub use redis::RedisStateStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a state store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Opaque blob storage keyed by name
///
/// Implementations provide no per-record locking; callers that need
/// read-modify-write consistency serialize access themselves.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the blob stored under `key`, `None` when nothing is stored
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob stored under `key`
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Human readable backend name for logs
    fn backend_name(&self) -> &'static str;
}
