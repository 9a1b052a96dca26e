//! Device service integration
//!
//! The coordinator only consumes the device service's booking contract:
//! book, release and execute. This module provides the capability trait the
//! coordinator depends on and the HTTP implementation used in production.

pub mod client;
pub mod error;

pub use client::{DeviceOperations, HttpDeviceClient};
pub use error::DeviceError;

#[cfg(test)]
pub use client::MockDeviceOperations;
