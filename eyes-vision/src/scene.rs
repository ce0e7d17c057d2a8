//! Rule-based scene classification

use eyes_core::{Detection, LabelTables};
use std::collections::BTreeSet;
use tracing::debug;

/// Scene label for a set of detections.
///
/// Every rule gets one vote per distinct detected label it lists. The most
/// votes wins, earlier rules win ties, and zero votes gives the default scene.
pub fn classify_scene(detections: &[Detection], tables: &LabelTables) -> String {
    let labels: BTreeSet<&str> = detections.iter().map(|d| d.label.as_str()).collect();

    let mut best: Option<(&str, usize)> = None;
    for rule in &tables.scene_rules {
        let votes = labels.iter().filter(|l| rule.labels.contains(**l)).count();
        if votes == 0 {
            continue;
        }
        match best {
            Some((_, best_votes)) if votes <= best_votes => {}
            _ => best = Some((rule.scene.as_str(), votes)),
        }
    }

    match best {
        Some((scene, votes)) => {
            debug!("Scene '{}' with {} votes", scene, votes);
            scene.to_string()
        }
        None => tables.default_scene.clone(),
    }
}
