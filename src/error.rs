// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the overlay pipeline.

use std::fmt;

/// Result type alias for overlay operations.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Main error type for the overlay pipeline.
#[derive(Debug)]
pub enum OverlayError {
    /// Degenerate source or surface size (zero width or height).
    InvalidDimensions(String),
    /// The pose estimator rejected the frame or failed while running.
    EstimationFailure(String),
    /// Estimation or rendering was attempted before a frame was available.
    UnreadyFrame,
    /// Error loading the ONNX model.
    ModelLoadError(String),
    /// Error processing images.
    ImageError(String),
    /// Video decoding or encoding error.
    VideoError(String),
    /// Visualizer window error.
    VisualizerError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// IO error with context.
    IoError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Feature not enabled.
    FeatureNotEnabled(String),
}

impl OverlayError {
    /// Whether the driver should skip the frame and keep running.
    ///
    /// Every variant is recoverable at the frame level except configuration
    /// and feature errors, which would repeat on every tick.
    #[must_use]
    pub const fn is_frame_local(&self) -> bool {
        !matches!(self, Self::ConfigError(_) | Self::FeatureNotEnabled(_))
    }
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions(msg) => write!(f, "Invalid dimensions: {msg}"),
            Self::EstimationFailure(msg) => write!(f, "Estimation failure: {msg}"),
            Self::UnreadyFrame => write!(f, "No frame is ready to present"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OverlayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for OverlayError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OverlayError::InvalidDimensions("target 640x0".to_string());
        assert_eq!(err.to_string(), "Invalid dimensions: target 640x0");

        let err = OverlayError::EstimationFailure("session closed".to_string());
        assert_eq!(err.to_string(), "Estimation failure: session closed");

        assert_eq!(
            OverlayError::UnreadyFrame.to_string(),
            "No frame is ready to present"
        );
    }

    #[test]
    fn test_frame_local_errors() {
        assert!(OverlayError::UnreadyFrame.is_frame_local());
        assert!(OverlayError::EstimationFailure(String::new()).is_frame_local());
        assert!(OverlayError::InvalidDimensions(String::new()).is_frame_local());
        assert!(!OverlayError::ConfigError(String::new()).is_frame_local());
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err = OverlayError::from(std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(OverlayError::UnreadyFrame.source().is_none());
    }
}
