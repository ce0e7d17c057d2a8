// Label tables driving post-processing: object heights, priority tiers,
// currency denominations and scene rules. Loaded once with the rest of the
// configuration and treated as read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Priority weights per label tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticWeights {
    /// Vehicles, moving beings, sharp objects
    pub critical: f32,
    /// Trip and collision hazards
    pub hazard: f32,
    /// Everything else
    pub default: f32,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        Self {
            critical: 3.0,
            hazard: 2.0,
            default: 1.0,
        }
    }
}

/// A detector class that represents money
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDenomination {
    /// Detector class name, e.g. `100_peso`
    pub label: String,
    /// Spoken form, e.g. `₱100 bill`
    pub display: String,
    pub value: f64,
}

/// One row of the scene table: any of `labels` votes for `scene`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRule {
    pub scene: String,
    pub labels: BTreeSet<String>,
}

impl SceneRule {
    pub fn new(scene: &str, labels: &[&str]) -> Self {
        Self {
            scene: scene.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// All label-keyed tables used after inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTables {
    /// Dominant visible vertical extent of each class, in meters
    pub known_heights: BTreeMap<String, f32>,
    pub critical: BTreeSet<String>,
    pub hazard: BTreeSet<String>,
    pub weights: SemanticWeights,
    pub currency: Vec<CurrencyDenomination>,
    /// Ordered: earlier rules win ties
    pub scene_rules: Vec<SceneRule>,
    /// Scene reported when no rule matches
    pub default_scene: String,
}

impl LabelTables {
    /// Semantic weight used by the priority selector
    pub fn weight_for(&self, label: &str) -> f32 {
        if self.critical.contains(label) {
            self.weights.critical
        } else if self.hazard.contains(label) {
            self.weights.hazard
        } else {
            self.weights.default
        }
    }

    pub fn known_height(&self, label: &str) -> Option<f32> {
        self.known_heights.get(label).copied()
    }

    pub fn denomination(&self, label: &str) -> Option<&CurrencyDenomination> {
        self.currency.iter().find(|d| d.label == label)
    }

    pub fn is_currency(&self, label: &str) -> bool {
        self.denomination(label).is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        for (label, height) in &self.known_heights {
            if !height.is_finite() || *height <= 0.0 {
                return Err(format!("known height for '{}' must be positive", label));
            }
        }

        let weights = [self.weights.critical, self.weights.hazard, self.weights.default];
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err("semantic weights must be positive".to_string());
        }

        if self.default_scene.trim().is_empty() {
            return Err("default_scene cannot be empty".to_string());
        }

        if let Some(rule) = self.scene_rules.iter().find(|r| r.labels.is_empty()) {
            return Err(format!("scene rule '{}' has no labels", rule.scene));
        }

        Ok(())
    }
}

const KNOWN_HEIGHTS: &[(&str, f32)] = &[
    // People & riding
    ("person", 1.7),
    ("bicycle", 1.0),
    ("motorcycle", 1.1),
    ("skateboard", 0.15),
    ("surfboard", 1.8),
    ("skis", 1.6),
    ("snowboard", 1.4),
    // Vehicles
    ("car", 1.5),
    ("truck", 3.0),
    ("bus", 3.2),
    ("train", 3.5),
    ("airplane", 5.0),
    ("boat", 2.0),
    // Traffic infrastructure
    ("traffic light", 0.6),
    ("fire hydrant", 0.6),
    ("stop sign", 0.75),
    ("parking meter", 1.2),
    ("bench", 0.5),
    // Animals (shoulder height unless noted)
    ("bird", 0.2),
    ("cat", 0.3),
    ("dog", 0.5),
    ("horse", 1.6),
    ("sheep", 0.9),
    ("cow", 1.4),
    ("elephant", 3.0),
    ("bear", 1.2),
    ("zebra", 1.5),
    ("giraffe", 5.0),
    // Accessories
    ("backpack", 0.45),
    ("umbrella", 0.9),
    ("handbag", 0.3),
    ("tie", 1.4),
    ("suitcase", 0.7),
    // Sports
    ("frisbee", 0.27),
    ("sports ball", 0.22),
    ("kite", 0.8),
    ("baseball bat", 0.85),
    ("baseball glove", 0.25),
    ("tennis racket", 0.68),
    // Food & kitchen
    ("bottle", 0.25),
    ("wine glass", 0.22),
    ("cup", 0.15),
    ("fork", 0.20),
    ("knife", 0.25),
    ("spoon", 0.18),
    ("bowl", 0.10),
    ("banana", 0.18),
    ("apple", 0.08),
    ("sandwich", 0.12),
    ("orange", 0.08),
    ("broccoli", 0.20),
    ("carrot", 0.18),
    ("hot dog", 0.15),
    ("pizza", 0.30),
    ("donut", 0.10),
    ("cake", 0.15),
    // Indoor furniture & devices
    ("chair", 0.90),
    ("couch", 0.85),
    ("potted plant", 0.40),
    ("bed", 0.60),
    ("dining table", 0.75),
    ("toilet", 0.40),
    ("tv", 0.60),
    ("laptop", 0.30),
    ("mouse", 0.04),
    ("remote", 0.18),
    ("keyboard", 0.03),
    ("cell phone", 0.15),
    ("microwave", 0.30),
    ("oven", 0.90),
    ("toaster", 0.20),
    ("sink", 0.50),
    ("refrigerator", 1.80),
    ("clock", 0.30),
    ("vase", 0.30),
    ("scissors", 0.18),
    ("teddy bear", 0.30),
    ("hair drier", 0.25),
    ("toothbrush", 0.18),
    ("book", 0.25),
];

const CRITICAL_LABELS: &[&str] = &[
    "car", "truck", "bus", "motorcycle", "bicycle", "train",
    "traffic light", "stop sign", "fire hydrant", "parking meter",
    "person", "dog", "horse", "cow", "elephant", "bear",
    "knife", "scissors", "baseball bat",
];

const HAZARD_LABELS: &[&str] = &[
    "bench", "potted plant", "suitcase", "backpack",
    "skateboard", "sports ball", "bird", "cat", "sheep", "zebra",
    "couch", "chair", "dining table",
];

const PESO_DENOMINATIONS: &[(&str, &str, f64)] = &[
    ("20_peso", "₱20 bill", 20.0),
    ("50_peso", "₱50 bill", 50.0),
    ("100_peso", "₱100 bill", 100.0),
    ("200_peso", "₱200 bill", 200.0),
    ("500_peso", "₱500 bill", 500.0),
    ("1000_peso", "₱1000 bill", 1000.0),
    ("coin_1", "₱1 coin", 1.0),
    ("coin_5", "₱5 coin", 5.0),
    ("coin_10", "₱10 coin", 10.0),
];

fn default_scene_rules() -> Vec<SceneRule> {
    vec![
        SceneRule::new("Kitchen", &["oven", "refrigerator", "sink", "microwave"]),
        SceneRule::new("Bathroom", &["toilet", "sink"]),
        SceneRule::new("Bedroom", &["bed", "clock"]),
        SceneRule::new("Living room", &["couch", "tv", "remote"]),
        SceneRule::new("Dining area", &["dining table", "cup", "fork", "knife", "spoon", "bowl"]),
        SceneRule::new("Office / Desk", &["laptop", "keyboard", "mouse", "monitor"]),
        SceneRule::new("Outdoor / Street", &["car", "truck", "bus", "traffic light", "stop sign", "crosswalk"]),
        SceneRule::new("Outdoor / Road", &["bicycle", "motorcycle"]),
        SceneRule::new("Outdoor / Park", &["bench", "potted plant", "bird"]),
        SceneRule::new("Indoor", &["chair", "table", "sofa", "book", "vase", "teddy bear"]),
        SceneRule::new("General area", &["person"]),
    ]
}

impl Default for LabelTables {
    fn default() -> Self {
        Self {
            known_heights: KNOWN_HEIGHTS
                .iter()
                .map(|(label, h)| (label.to_string(), *h))
                .collect(),
            critical: CRITICAL_LABELS.iter().map(|l| l.to_string()).collect(),
            hazard: HAZARD_LABELS.iter().map(|l| l.to_string()).collect(),
            weights: SemanticWeights::default(),
            currency: PESO_DENOMINATIONS
                .iter()
                .map(|(label, display, value)| CurrencyDenomination {
                    label: label.to_string(),
                    display: display.to_string(),
                    value: *value,
                })
                .collect(),
            scene_rules: default_scene_rules(),
            default_scene: "Unknown".to_string(),
        }
    }
}
