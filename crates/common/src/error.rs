//! Error types shared across FrameCast crates.

/// Top-level error type for FrameCast operations.
#[derive(Debug, thiserror::Error)]
pub enum FramecastError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    /// The capture device handle is not initialized or has stopped
    /// delivering frames. Recoverable: the scheduler skips the cycle.
    #[error("Capture device not ready")]
    DeviceNotReady,

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramecastError.
pub type FramecastResult<T> = Result<T, FramecastError>;

impl FramecastError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error means the capture source was unavailable
    /// for a single cycle rather than permanently broken.
    pub fn is_device_not_ready(&self) -> bool {
        matches!(self, Self::DeviceNotReady)
    }
}
