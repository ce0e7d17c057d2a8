//! Currency recognition over detector output

use eyes_core::{Detection, LabelTables};

/// Currency label with the highest confidence; first seen wins ties.
pub fn recognize_currency(detections: &[Detection], tables: &LabelTables) -> Option<String> {
    let mut best: Option<&Detection> = None;
    for detection in detections.iter().filter(|d| tables.is_currency(&d.label)) {
        match best {
            Some(current) if detection.confidence <= current.confidence => {}
            _ => best = Some(detection),
        }
    }
    best.map(|d| d.label.clone())
}

/// Spoken summary of every note and coin in view, e.g.
/// `"₱100 bill, ₱20 bill – total ₱120"`.
pub fn currency_summary(detections: &[Detection], tables: &LabelTables) -> Option<String> {
    let found: Vec<_> = detections
        .iter()
        .filter_map(|d| tables.denomination(&d.label))
        .collect();

    if found.is_empty() {
        return None;
    }

    let total: f64 = found.iter().map(|d| d.value).sum();
    let names: Vec<&str> = found.iter().map(|d| d.display.as_str()).collect();
    Some(format!("{} – total ₱{}", names.join(", "), format_amount(total)))
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
