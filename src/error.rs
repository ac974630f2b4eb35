//! Error types for the detection path and configuration loading
//!
//! Detection errors are never fatal to a running session: the host loop
//! logs them and treats the tick as "no detection".

use thiserror::Error;

/// Failures on the landmark / detection path
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The frame or landmark provider could not produce a result
    #[error("detection source unavailable: {0}")]
    SourceUnavailable(String),

    /// Malformed external payload (undecodable image, bad request body)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A face landmark set is shorter than the index contract requires
    #[error("landmark set has {got} points, index {index} required")]
    MalformedLandmarks { got: usize, index: usize },
}

impl DetectionError {
    /// Short machine-readable kind, used in wire responses
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::SourceUnavailable(_) => "source_unavailable",
            DetectionError::InvalidInput(_) => "invalid_input",
            DetectionError::MalformedLandmarks { .. } => "malformed_landmarks",
        }
    }
}

/// Failures while loading `AppConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
