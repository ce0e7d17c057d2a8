//! Distance mapping from relative depth and apparent size

use crate::depth::DepthMap;
use crate::utils::round_to;
use eyes_core::{BoundingBox, Detection, LabelTables, ProcessingConfig};

/// Fraction of the box, each side of its center, sampled for depth
const CENTER_FRACTION: f32 = 0.3;
const NEAREST_M: f64 = 0.3;
const FARTHEST_M: f64 = 15.0;
/// Normalized depth at or below which an object counts as far away
const FAR_CUTOFF: f64 = 0.01;
const PINHOLE_RANGE_M: (f64, f64) = (0.2, 20.0);

/// Distance in meters for one detection, rounded to centimeters.
///
/// Returns `None` when the box lies outside the frame or the depth sample is
/// unusable (flat map, no finite samples, non-positive median).
pub fn estimate_distance(
    detection: &Detection,
    depth: &DepthMap,
    tables: &LabelTables,
    config: &ProcessingConfig,
) -> Option<f32> {
    let (frame_w, frame_h) = depth.frame_size();
    let bbox = detection.bbox.clamp_to(frame_w, frame_h)?;

    let from_depth = depth_estimate(&bbox, depth)?;

    let mut estimates = vec![from_depth];
    if let Some(height_m) = tables.known_height(&detection.label) {
        if let Some(d) = pinhole_estimate(bbox.height(), height_m, frame_h, config) {
            estimates.push(d);
        }
    }

    let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
    Some(round_to(mean, 2) as f32)
}

/// Fill in `distance` on every detection.
pub fn assign_distances(
    detections: &mut [Detection],
    depth: &DepthMap,
    tables: &LabelTables,
    config: &ProcessingConfig,
) {
    for detection in detections.iter_mut() {
        detection.distance = estimate_distance(detection, depth, tables, config);
    }
}

/// Central region of `bbox`, at least one pixel in each direction
fn center_region(bbox: &BoundingBox) -> BoundingBox {
    let cx = (bbox.x1 + bbox.x2) as f32 / 2.0;
    let cy = (bbox.y1 + bbox.y2) as f32 / 2.0;
    let half_w = bbox.width() as f32 * CENTER_FRACTION;
    let half_h = bbox.height() as f32 * CENTER_FRACTION;

    let x1 = (cx - half_w).floor() as i32;
    let y1 = (cy - half_h).floor() as i32;
    let x2 = ((cx + half_w).ceil() as i32).max(x1 + 1);
    let y2 = ((cy + half_h).ceil() as i32).max(y1 + 1);

    BoundingBox::new(x1, y1, x2, y2)
}

fn depth_estimate(bbox: &BoundingBox, depth: &DepthMap) -> Option<f64> {
    let median = depth.region_median(&center_region(bbox))? as f64;
    let (min, max) = depth.value_range()?;
    let (min, max) = (min as f64, max as f64);

    if median <= 0.0 || max - min <= f64::EPSILON {
        return None;
    }

    // MiDaS output is inverse depth: larger is closer
    let normalized = ((median - min) / (max - min)).clamp(0.0, 1.0);
    if normalized <= FAR_CUTOFF {
        return Some(FARTHEST_M);
    }

    let meters = NEAREST_M + (1.0 - normalized) * (FARTHEST_M - NEAREST_M);
    Some(meters.clamp(NEAREST_M, FARTHEST_M))
}

/// `d = f' * H / h` with the focal length rescaled to the frame height
fn pinhole_estimate(
    box_height_px: i32,
    object_height_m: f32,
    frame_height: u32,
    config: &ProcessingConfig,
) -> Option<f64> {
    if box_height_px <= 0 {
        return None;
    }

    let focal = config.focal_length_px as f64 * frame_height as f64 / config.reference_height_px as f64;
    let meters = focal * object_height_m as f64 / box_height_px as f64;
    Some(meters.clamp(PINHOLE_RANGE_M.0, PINHOLE_RANGE_M.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64x64 grid over a 640x640 frame: background 0, one far-corner cell at
    /// 1.0, and the cells under (100,200)-(400,500) at `level`.
    fn scene_depth(level: f32) -> DepthMap {
        let mut values = vec![0.0f32; 64 * 64];
        values[0] = 1.0;
        for y in 20..50 {
            for x in 10..40 {
                values[y * 64 + x] = level;
            }
        }
        DepthMap::new(64, 64, values, 640, 640).unwrap()
    }

    fn car() -> Detection {
        Detection::new("car", 0.87, BoundingBox::new(100, 200, 400, 500))
    }

    #[test]
    fn test_center_region() {
        let region = center_region(&BoundingBox::new(100, 200, 400, 500));
        assert_eq!(region, BoundingBox::new(160, 260, 340, 440));

        let tiny = center_region(&BoundingBox::new(10, 10, 11, 11));
        assert_eq!(tiny.width(), 1);
        assert_eq!(tiny.height(), 1);
    }

    #[test]
    fn test_depth_and_pinhole_agree() {
        // (1 - 0.85034014) * 14.7 + 0.3 == 2.5 and 500 * 1.5 / 300 == 2.5
        let depth = scene_depth(0.850_340_14);
        let distance = estimate_distance(&car(), &depth, &LabelTables::default(), &ProcessingConfig::default());
        assert_eq!(distance, Some(2.5));
    }

    #[test]
    fn test_unknown_label_uses_depth_only() {
        let depth = scene_depth(0.5);
        let detection = Detection::new("100_peso", 0.9, BoundingBox::new(100, 200, 400, 500));
        let distance =
            estimate_distance(&detection, &depth, &LabelTables::default(), &ProcessingConfig::default());
        // 0.3 + 0.5 * 14.7
        assert_eq!(distance, Some(7.65));
    }

    #[test]
    fn test_far_background_saturates() {
        // Box sits on background (0.0) but non-positive medians are rejected
        let depth = scene_depth(0.85);
        let detection = Detection::new("100_peso", 0.9, BoundingBox::new(500, 500, 600, 600));
        assert_eq!(
            estimate_distance(&detection, &depth, &LabelTables::default(), &ProcessingConfig::default()),
            None
        );

        // Tiny positive value just above the minimum reads as 15 m
        let mut values = vec![0.001f32; 16];
        values[0] = 1.0;
        let depth = DepthMap::new(4, 4, values, 40, 40).unwrap();
        let detection = Detection::new("100_peso", 0.9, BoundingBox::new(20, 20, 40, 40));
        assert_eq!(
            estimate_distance(&detection, &depth, &LabelTables::default(), &ProcessingConfig::default()),
            Some(15.0)
        );
    }

    #[test]
    fn test_flat_map_yields_none() {
        let depth = DepthMap::new(8, 8, vec![0.7; 64], 640, 640).unwrap();
        assert_eq!(
            estimate_distance(&car(), &depth, &LabelTables::default(), &ProcessingConfig::default()),
            None
        );
    }

    #[test]
    fn test_box_outside_frame_yields_none() {
        let depth = scene_depth(0.85);
        let detection = Detection::new("car", 0.9, BoundingBox::new(700, 700, 800, 800));
        assert_eq!(
            estimate_distance(&detection, &depth, &LabelTables::default(), &ProcessingConfig::default()),
            None
        );
    }

    #[test]
    fn test_pinhole_estimate() {
        let config = ProcessingConfig::default();
        assert_eq!(pinhole_estimate(300, 1.5, 640, &config), Some(2.5));
        // Focal length scales with frame height
        assert_eq!(pinhole_estimate(300, 1.5, 1280, &config), Some(5.0));
        assert_eq!(pinhole_estimate(1, 1.7, 640, &config), Some(20.0));
        assert_eq!(pinhole_estimate(0, 1.7, 640, &config), None);
    }

    #[test]
    fn test_assign_distances() {
        let depth = scene_depth(0.850_340_14);
        let mut detections = vec![car(), Detection::new("car", 0.5, BoundingBox::new(900, 0, 950, 10))];
        assign_distances(&mut detections, &depth, &LabelTables::default(), &ProcessingConfig::default());
        assert_eq!(detections[0].distance, Some(2.5));
        assert_eq!(detections[1].distance, None);
    }
}
