//! Vision model management and inference
//!
//! Each network sits behind a small trait so the pipeline can be driven by
//! ONNX sessions in production and by mocks in tests.

pub mod manager;
pub mod midas;
mod onnx;
pub mod yolo;
pub mod zero_dce;

use crate::depth::DepthMap;
use crate::error::VisionError;
use eyes_core::Detection;
use image::RgbImage;
use std::sync::Arc;

pub use manager::ModelManager;
pub use midas::MidasModel;
pub use yolo::{YoloModel, COCO_CLASSES};
pub use zero_dce::ZeroDceModel;

/// Low-light image-to-image enhancement
#[cfg_attr(test, mockall::automock)]
pub trait LowLightEnhancer: Send + Sync {
    /// Returns a frame with the same dimensions as `frame`.
    fn enhance(&self, frame: &RgbImage) -> Result<RgbImage, VisionError>;
}

/// Object detection
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Detections in frame pixel coordinates, distances unset.
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, VisionError>;
}

/// Monocular relative depth estimation
#[cfg_attr(test, mockall::automock)]
pub trait DepthEstimator: Send + Sync {
    fn estimate(&self, frame: &RgbImage) -> Result<DepthMap, VisionError>;
}

/// The loaded models, shared read-only by every request.
#[derive(Clone)]
pub struct ModelSet {
    pub enhancer: Arc<dyn LowLightEnhancer>,
    pub detector: Arc<dyn ObjectDetector>,
    pub depth: Arc<dyn DepthEstimator>,
}

impl ModelSet {
    pub fn new(
        enhancer: Arc<dyn LowLightEnhancer>,
        detector: Arc<dyn ObjectDetector>,
        depth: Arc<dyn DepthEstimator>,
    ) -> Self {
        Self {
            enhancer,
            detector,
            depth,
        }
    }
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet").finish_non_exhaustive()
    }
}
