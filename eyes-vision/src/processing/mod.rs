//! Post-inference processing: enhancement gate, distances, currency,
//! priority and alerts

pub mod currency;
pub mod distance;
pub mod enhancement;
pub mod priority;

pub use currency::{currency_summary, recognize_currency};
pub use distance::{assign_distances, estimate_distance};
pub use enhancement::{apply_gate, GateOutcome};
pub use priority::{generate_alerts, select_priority, PriorityObject};
