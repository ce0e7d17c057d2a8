//! Error types for eyes-vision

use eyes_core::ConfigError;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// Undecodable, empty or oversized frame; reported to the client as 400
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Weights missing or unloadable
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A model failed while running on a valid frame
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Wrap an ONNX Runtime failure with the step that produced it.
pub(crate) fn ort_error(context: &str, err: impl Display) -> VisionError {
    VisionError::Inference(format!("{}: {}", context, err))
}
