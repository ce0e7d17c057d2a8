//! eyes-vision: perception pipeline for the EYES assistive backend
//!
//! Turns one camera frame into a navigation summary: low-light enhancement,
//! object detection, monocular depth, per-object distance, scene type,
//! currency and a prioritized list of proximity alerts.

pub mod depth;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod scene;
pub mod utils;

pub use depth::DepthMap;
pub use error::VisionError;
pub use models::{DepthEstimator, LowLightEnhancer, ModelManager, ModelSet, ObjectDetector};
pub use pipeline::VisionPipeline;
