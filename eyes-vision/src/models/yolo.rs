//! YOLO object detection model

use crate::error::VisionError;
use crate::models::onnx::{load_session, run_single};
use crate::models::ObjectDetector;
use crate::utils::{image_to_chw, letterbox, Letterbox};
use eyes_core::{BoundingBox, Detection};
use image::RgbImage;
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Upper bound on boxes kept after NMS
const MAX_DETECTIONS: usize = 300;

/// Thresholds applied while decoding raw YOLO output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

/// Box candidate in frame pixels, before NMS
#[derive(Debug, Clone)]
struct Candidate {
    class_id: usize,
    confidence: f32,
    bbox: (f32, f32, f32, f32), // x1, y1, x2, y2
}

/// YOLOv8 model for object detection
pub struct YoloModel {
    session: Mutex<Session>,
    labels: Vec<String>,
    input_size: u32,
    params: DecodeParams,
}

impl YoloModel {
    /// Create a new YOLO model
    pub fn new(
        model_path: &Path,
        labels: Vec<String>,
        input_size: u32,
        params: DecodeParams,
    ) -> Result<Self, VisionError> {
        if labels.is_empty() {
            return Err(VisionError::ModelUnavailable("YOLO label list is empty".to_string()));
        }

        let session = load_session(model_path, "YOLO")?;
        info!("YOLO detector ready: {} classes, {}px input", labels.len(), input_size);

        Ok(Self {
            session,
            labels,
            input_size,
            params,
        })
    }

    /// Class names from a file with one label per line, or COCO when `None`.
    pub fn load_labels(path: Option<&Path>) -> Result<Vec<String>, VisionError> {
        let Some(path) = path else {
            return Ok(COCO_CLASSES.iter().map(|c| c.to_string()).collect());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            VisionError::ModelUnavailable(format!("Failed to read YOLO labels {}: {}", path.display(), e))
        })?;

        let labels: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if labels.is_empty() {
            return Err(VisionError::ModelUnavailable(format!(
                "YOLO labels file {} has no entries",
                path.display()
            )));
        }

        Ok(labels)
    }
}

impl ObjectDetector for YoloModel {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, VisionError> {
        debug!("Running YOLO detection on frame");

        let size = self.input_size as usize;
        let (boxed, lb) = letterbox(frame, self.input_size);
        let input = image_to_chw(&boxed, [0.0; 3], [1.0; 3]);

        let (dims, data) = run_single(&self.session, [1, 3, size, size], input, "YOLO")?;
        let detections = decode_output(&dims, &data, &self.labels, &lb, frame.dimensions(), self.params)?;

        debug!("YOLO detected {} objects", detections.len());
        Ok(detections)
    }
}

/// Decode a YOLOv8 output tensor into frame-space detections.
///
/// Accepts `[1, 4 + classes, anchors]` and the transposed
/// `[1, anchors, 4 + classes]` layout. Rows are `cx, cy, w, h` in model-input
/// pixels followed by per-class scores.
pub fn decode_output(
    dims: &[i64],
    data: &[f32],
    labels: &[String],
    lb: &Letterbox,
    frame_size: (u32, u32),
    params: DecodeParams,
) -> Result<Vec<Detection>, VisionError> {
    if dims.len() != 3 || dims[0] != 1 || dims.iter().any(|&d| d <= 0) {
        return Err(VisionError::Inference(format!("Unexpected YOLO output shape {:?}", dims)));
    }

    let transposed = dims[1] > dims[2];
    let (features, anchors) = if transposed {
        (dims[2] as usize, dims[1] as usize)
    } else {
        (dims[1] as usize, dims[2] as usize)
    };

    if features < 5 {
        return Err(VisionError::Inference(format!("YOLO output has no class scores: {:?}", dims)));
    }
    if data.len() != features * anchors {
        return Err(VisionError::Inference(format!(
            "YOLO output holds {} values, shape {:?}",
            data.len(),
            dims
        )));
    }

    let at = |feature: usize, anchor: usize| {
        if transposed {
            data[anchor * features + feature]
        } else {
            data[feature * anchors + anchor]
        }
    };

    let num_classes = features - 4;
    let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);
    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for class_id in 0..num_classes {
            let score = at(4 + class_id, anchor);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !best_score.is_finite() || best_score < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        if !cx.is_finite() || !cy.is_finite() || !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
            continue; // Skip invalid detections
        }

        let (x1, y1) = lb.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.to_frame(cx + w / 2.0, cy + h / 2.0);

        candidates.push(Candidate {
            class_id: best_class,
            confidence: best_score.min(1.0),
            bbox: (
                x1.clamp(0.0, frame_w),
                y1.clamp(0.0, frame_h),
                x2.clamp(0.0, frame_w),
                y2.clamp(0.0, frame_h),
            ),
        });
    }

    let kept = apply_nms(candidates, params.iou_threshold);

    Ok(kept
        .into_iter()
        .filter_map(|c| {
            let bbox = BoundingBox::new(
                c.bbox.0.round() as i32,
                c.bbox.1.round() as i32,
                c.bbox.2.round() as i32,
                c.bbox.3.round() as i32,
            );
            if bbox.width() == 0 || bbox.height() == 0 {
                return None;
            }
            let label = labels
                .get(c.class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", c.class_id));
            Some(Detection::new(label, c.confidence, bbox))
        })
        .collect())
}

/// Class-aware Non-Maximum Suppression
fn apply_nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    // Sort by confidence (descending); stable so equal scores keep anchor order
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(candidates[i].clone());
        if keep.len() == MAX_DETECTIONS {
            break;
        }

        for j in (i + 1)..candidates.len() {
            if suppressed[j] || candidates[j].class_id != candidates[i].class_id {
                continue;
            }

            if compute_iou(&candidates[i].bbox, &candidates[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Compute IoU between two `(x1, y1, x2, y2)` boxes
fn compute_iou(a: &(f32, f32, f32, f32), b: &(f32, f32, f32, f32)) -> f32 {
    let inter_w = (a.2.min(b.2) - a.0.max(b.0)).max(0.0);
    let inter_h = (a.3.min(b.3) - a.1.max(b.1)).max(0.0);
    let inter_area = inter_w * inter_h;
    if inter_area <= 0.0 {
        return 0.0;
    }

    let area_a = (a.2 - a.0) * (a.3 - a.1);
    let area_b = (b.2 - b.0) * (b.3 - b.1);
    let union_area = area_a + area_b - inter_area;

    if union_area <= 0.0 || !union_area.is_finite() {
        return 0.0;
    }

    (inter_area / union_area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: DecodeParams = DecodeParams {
        confidence_threshold: 0.35,
        iou_threshold: 0.45,
    };

    fn labels() -> Vec<String> {
        vec!["person".to_string(), "car".to_string()]
    }

    fn identity() -> Letterbox {
        Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 }
    }

    /// Build a `[1, 6, N]` tensor from `(cx, cy, w, h, person, car)` rows.
    fn channels_first(rows: &[[f32; 6]]) -> (Vec<i64>, Vec<f32>) {
        let n = rows.len();
        let mut data = vec![0.0; 6 * n];
        for (anchor, row) in rows.iter().enumerate() {
            for (feature, value) in row.iter().enumerate() {
                data[feature * n + anchor] = *value;
            }
        }
        (vec![1, 6, n as i64], data)
    }

    #[test]
    fn test_decode_single_box() {
        let (dims, data) = channels_first(&[[250.0, 350.0, 300.0, 300.0, 0.1, 0.87]]);
        let detections = decode_output(&dims, &data, &labels(), &identity(), (640, 640), PARAMS).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "car");
        assert_eq!(detections[0].confidence, 0.87);
        assert_eq!(detections[0].bbox, BoundingBox::new(100, 200, 400, 500));
        assert!(detections[0].distance.is_none());
    }

    #[test]
    fn test_decode_rounds_box_edges() {
        // Edges at 100.1 / 399.9 and 200.1 / 499.9
        let (dims, data) = channels_first(&[[250.0, 350.0, 299.8, 299.8, 0.0, 0.9]]);
        let detections = decode_output(&dims, &data, &labels(), &identity(), (640, 640), PARAMS).unwrap();
        assert_eq!(detections[0].bbox, BoundingBox::new(100, 200, 400, 500));
    }

    #[test]
    fn test_decode_filters_low_confidence() {
        let (dims, data) = channels_first(&[
            [100.0, 100.0, 50.0, 50.0, 0.2, 0.1],
            [300.0, 300.0, 50.0, 50.0, 0.35, 0.0],
        ]);
        let detections = decode_output(&dims, &data, &labels(), &identity(), (640, 640), PARAMS).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");
    }

    #[test]
    fn test_decode_transposed_layout() {
        // [1, N, 6] with N > 6
        let n = 8;
        let mut data = vec![0.0; n * 6];
        data[..6].copy_from_slice(&[320.0, 320.0, 100.0, 200.0, 0.9, 0.0]);
        let detections =
            decode_output(&[1, n as i64, 6], &data, &labels(), &identity(), (640, 640), PARAMS).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, BoundingBox::new(270, 220, 370, 420));
    }

    #[test]
    fn test_decode_maps_through_letterbox() {
        // 1280x640 frame letterboxed into 640: scale 0.5, pad_y 160
        let lb = Letterbox { scale: 0.5, pad_x: 0.0, pad_y: 160.0 };
        let (dims, data) = channels_first(&[[320.0, 320.0, 100.0, 100.0, 0.9, 0.0]]);
        let detections = decode_output(&dims, &data, &labels(), &lb, (1280, 640), PARAMS).unwrap();

        assert_eq!(detections[0].bbox, BoundingBox::new(540, 220, 740, 420));
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let (dims, data) = channels_first(&[[10.0, 630.0, 100.0, 100.0, 0.0, 0.9]]);
        let detections = decode_output(&dims, &data, &labels(), &identity(), (640, 640), PARAMS).unwrap();
        assert_eq!(detections[0].bbox, BoundingBox::new(0, 580, 60, 640));
    }

    #[test]
    fn test_nms_is_class_aware() {
        let (dims, data) = channels_first(&[
            [200.0, 200.0, 100.0, 100.0, 0.0, 0.9],
            [202.0, 202.0, 100.0, 100.0, 0.0, 0.8],
            [202.0, 202.0, 100.0, 100.0, 0.7, 0.0],
        ]);
        let detections = decode_output(&dims, &data, &labels(), &identity(), (640, 640), PARAMS).unwrap();

        let names: Vec<&str> = detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(names, vec!["car", "person"]);
        assert_eq!(detections[0].confidence, 0.9);
    }

    #[test]
    fn test_decode_unknown_class_index() {
        let (dims, data) = channels_first(&[[200.0, 200.0, 100.0, 100.0, 0.0, 0.9]]);
        let detections =
            decode_output(&dims, &data, &["person".to_string()], &identity(), (640, 640), PARAMS).unwrap();
        assert_eq!(detections[0].label, "class_1");
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert!(decode_output(&[1, 6], &[0.0; 6], &labels(), &identity(), (640, 640), PARAMS).is_err());
        assert!(decode_output(&[1, 4, 10], &[0.0; 40], &labels(), &identity(), (640, 640), PARAMS).is_err());
        assert!(decode_output(&[1, 6, 10], &[0.0; 59], &labels(), &identity(), (640, 640), PARAMS).is_err());
    }

    #[test]
    fn test_compute_iou() {
        let a = (0.0, 0.0, 10.0, 10.0);
        assert_eq!(compute_iou(&a, &a), 1.0);
        assert_eq!(compute_iou(&a, &(20.0, 20.0, 30.0, 30.0)), 0.0);
        let half = compute_iou(&a, &(5.0, 0.0, 15.0, 10.0));
        assert!((half - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_labels() {
        let coco = YoloModel::load_labels(None).unwrap();
        assert_eq!(coco.len(), 80);
        assert_eq!(coco[2], "car");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peso.txt");
        std::fs::write(&path, "20_peso\n\n 100_peso \ncoin_5\n").unwrap();
        let custom = YoloModel::load_labels(Some(&path)).unwrap();
        assert_eq!(custom, vec!["20_peso", "100_peso", "coin_5"]);

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "\n\n").unwrap();
        assert!(YoloModel::load_labels(Some(&empty)).is_err());
    }
}
