// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the preview bridge
//!
//! Errors fall into two groups. [`BridgeError::PermissionDenied`] and
//! [`BridgeError::CameraUnavailable`] are surfaced to the host application.
//! Protocol violations and released-resource races are absorbed where they
//! happen and only logged.

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using BridgeError
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Main bridge error type
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Camera permission was refused by the user
    PermissionDenied,
    /// Camera hardware or driver fault, never retried automatically
    CameraUnavailable(BackendError),
    /// An out-of-order platform callback
    ProtocolViolation(String),
    /// Attach attempted while the conversion resource is released
    ResourceReleased,
    /// A component was driven in a way its contract forbids
    InvalidState(String),
    /// GPU device or conversion failure
    Gpu(String),
    /// Configuration could not be loaded
    Config(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::PermissionDenied => write!(f, "Camera permission denied"),
            BridgeError::CameraUnavailable(e) => write!(f, "Camera unavailable: {}", e),
            BridgeError::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
            BridgeError::ResourceReleased => write!(f, "Conversion resource is released"),
            BridgeError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            BridgeError::Gpu(msg) => write!(f, "GPU error: {}", msg),
            BridgeError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<BackendError> for BridgeError {
    fn from(err: BackendError) -> Self {
        BridgeError::CameraUnavailable(err)
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            BridgeError::PermissionDenied.to_string(),
            "Camera permission denied"
        );
        assert_eq!(
            BridgeError::ProtocolViolation("resize before create".into()).to_string(),
            "Protocol violation: resize before create"
        );
    }

    #[test]
    fn test_backend_error_converts_to_camera_unavailable() {
        let err: BridgeError = BackendError::DeviceNotFound("/dev/video9".into()).into();
        assert_eq!(
            err.to_string(),
            "Camera unavailable: Device not found: /dev/video9"
        );
    }
}
