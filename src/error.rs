//! Error types for the distance-driven brightness controller.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// No camera could be opened (explicit index or auto-discovery range)
    #[error("No camera found: {0}")]
    NoCameraFound(String),

    /// Reading the next frame from the capture device failed
    #[error("Capture read failure: {0}")]
    CaptureReadFailure(String),

    /// Landmark pixel width was zero, negative or not a number
    #[error("Invalid measurement: pixel width {0} must be positive")]
    InvalidMeasurement(f64),

    /// Brightness backend failed to read or apply a level
    #[error("Brightness backend error: {0}")]
    Backend(String),

    /// Face or landmark detection failed on a frame
    #[error("Landmark detection error: {0}")]
    LandmarkDetection(String),

    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or output shape error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Process resource usage could not be sampled
    #[error("Diagnostics unavailable: {0}")]
    Diagnostics(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the sampling loop may carry on after this error.
    ///
    /// Only per-frame failures are recoverable; capture and startup failures end the session.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidMeasurement(_) | Self::Backend(_) | Self::LandmarkDetection(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::InvalidMeasurement(0.0).is_recoverable());
        assert!(Error::Backend("exit status 1".to_string()).is_recoverable());
        assert!(Error::LandmarkDetection("empty output".to_string()).is_recoverable());
        assert!(!Error::NoCameraFound("tried 0..6".to_string()).is_recoverable());
        assert!(!Error::CaptureReadFailure("empty frame".to_string()).is_recoverable());
    }

    #[test]
    fn test_invalid_measurement_message() {
        let msg = Error::InvalidMeasurement(-3.0).to_string();
        assert!(msg.contains("-3"));
        assert!(msg.contains("must be positive"));
    }
}
