use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Camera provider or detector could not be brought up.
    InitializationError(String),
    CameraCommandFailed(String),
    FocusFailed(String),
    StorageError(String),
    ConfigError(String),
    SessionClosed,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CaptureError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
            CaptureError::CameraCommandFailed(msg) => write!(f, "Camera command failed: {}", msg),
            CaptureError::FocusFailed(msg) => write!(f, "Focus failed: {}", msg),
            CaptureError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            CaptureError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            CaptureError::SessionClosed => write!(f, "Capture session is closed"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<crate::store::StoreError> for CaptureError {
    fn from(e: crate::store::StoreError) -> Self {
        CaptureError::StorageError(e.to_string())
    }
}
