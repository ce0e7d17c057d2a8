use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box in frame pixel coordinates.
///
/// Serialized as the `[x1, y1, x2, y2]` array the mobile client expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Intersect the box with a `width` x `height` frame.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);

        let clamped = BoundingBox {
            x1: self.x1.max(0),
            y1: self.y1.max(0),
            x2: self.x2.min(w),
            y2: self.y2.min(h),
        };

        if clamped.x2 <= clamped.x1 || clamped.y2 <= clamped.y1 {
            None
        } else {
            Some(clamped)
        }
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// A single detected object.
///
/// Produced by the detector with `distance: None`, then enriched by the
/// distance mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub distance: Option<f32>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
            distance: None,
        }
    }
}

/// Response body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub priority_object: Option<String>,
    pub distance: Option<f32>,
    pub currency: Option<String>,
    pub scene_type: String,
    pub alerts: Vec<String>,
    pub detections: Vec<Detection>,
    pub enhanced: bool,
    /// Wall-clock seconds spent in the pipeline for this request.
    pub processing_time: f64,
}
