//! Priority selection and proximity alerts

use eyes_core::{Detection, LabelTables};

/// Stand-in distance for detections whose distance is unknown
pub const UNKNOWN_DISTANCE_M: f32 = 999.0;
/// Distances are floored here before dividing
const MIN_DISTANCE_M: f32 = 0.1;

/// The detection most worth announcing
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityObject {
    pub label: String,
    pub distance: Option<f32>,
}

/// `weight(label) / max(distance, 0.1)`
pub fn priority_score(detection: &Detection, tables: &LabelTables) -> f32 {
    let distance = detection.distance.unwrap_or(UNKNOWN_DISTANCE_M).max(MIN_DISTANCE_M);
    tables.weight_for(&detection.label) / distance
}

/// Highest score wins; the earliest detection wins ties.
pub fn select_priority(detections: &[Detection], tables: &LabelTables) -> Option<PriorityObject> {
    let mut best: Option<(&Detection, f32)> = None;
    for detection in detections {
        let score = priority_score(detection, tables);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((detection, score)),
        }
    }

    best.map(|(d, _)| PriorityObject {
        label: d.label.clone(),
        distance: d.distance,
    })
}

/// One alert per detection closer than `safety_distance_m`, nearest first.
///
/// The alert carries the same distance the detection reports.
pub fn generate_alerts(detections: &[Detection], safety_distance_m: f32) -> Vec<String> {
    let mut close: Vec<(&Detection, f32)> = detections
        .iter()
        .filter_map(|d| d.distance.filter(|&m| m < safety_distance_m).map(|m| (d, m)))
        .collect();

    // Stable: equal distances keep detection order
    close.sort_by(|a, b| a.1.total_cmp(&b.1));

    close
        .into_iter()
        .map(|(d, m)| format!("{} nearby – {}m", d.label, m))
        .collect()
}
