//! Relative depth grid aligned to a frame

use crate::error::VisionError;
use crate::utils::median;
use eyes_core::BoundingBox;

/// Relative inverse depth at the model's native resolution.
///
/// Larger values are closer. The grid remembers the frame size it describes
/// so that frame-space boxes can be sampled without resizing the map.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
    frame_width: u32,
    frame_height: u32,
}

impl DepthMap {
    pub fn new(
        width: usize,
        height: usize,
        values: Vec<f32>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::Inference("Depth grid cannot be empty".to_string()));
        }
        if values.len() != width * height {
            return Err(VisionError::Inference(format!(
                "Depth grid has {} values, expected {}x{}",
                values.len(),
                width,
                height
            )));
        }
        if frame_width == 0 || frame_height == 0 {
            return Err(VisionError::Inference("Depth frame size cannot be zero".to_string()));
        }

        Ok(Self {
            width,
            height,
            values,
            frame_width,
            frame_height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Global (min, max) over finite values
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Median depth over a frame-space region.
    ///
    /// The region is scaled into grid cells and always covers at least one
    /// cell. Returns `None` when the region lies outside the frame or holds no
    /// finite samples.
    pub fn region_median(&self, region: &BoundingBox) -> Option<f32> {
        let region = region.clamp_to(self.frame_width, self.frame_height)?;

        let (gx1, gx2) = grid_span(region.x1, region.x2, self.frame_width, self.width);
        let (gy1, gy2) = grid_span(region.y1, region.y2, self.frame_height, self.height);

        let mut samples = Vec::with_capacity((gx2 - gx1) * (gy2 - gy1));
        for y in gy1..gy2 {
            let row = y * self.width;
            samples.extend_from_slice(&self.values[row + gx1..row + gx2]);
        }

        median(&samples)
    }
}

/// Map the frame interval `[lo, hi)` onto grid cells, never empty.
fn grid_span(lo: i32, hi: i32, frame_extent: u32, cells: usize) -> (usize, usize) {
    let ratio = cells as f64 / frame_extent as f64;
    let start = ((lo as f64 * ratio).floor() as usize).min(cells - 1);
    let end = ((hi as f64 * ratio).ceil() as usize).clamp(start + 1, cells);
    (start, end)
}
