//! Per-request analysis pipeline
//!
//! decode -> enhancement gate -> (detection || depth) -> distances -> scene,
//! currency, priority and alerts.

use crate::error::VisionError;
use crate::ingest::decode_frame;
use crate::models::ModelSet;
use crate::processing::{
    apply_gate, assign_distances, currency_summary, generate_alerts, recognize_currency,
    select_priority,
};
use crate::scene::classify_scene;
use crate::utils::round_to;
use eyes_core::{AnalysisResult, LabelTables, ProcessingConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Models plus the immutable settings every request needs.
///
/// Built once at startup and shared across requests.
pub struct VisionPipeline {
    models: ModelSet,
    config: ProcessingConfig,
    tables: Arc<LabelTables>,
}

impl VisionPipeline {
    pub fn new(models: ModelSet, config: ProcessingConfig, tables: Arc<LabelTables>) -> Self {
        Self {
            models,
            config,
            tables,
        }
    }

    /// Analyze one encoded frame.
    ///
    /// Blocking and CPU-bound; async callers should run it on a blocking
    /// thread.
    pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisResult, VisionError> {
        let started = Instant::now();

        let frame = decode_frame(bytes, self.config.max_frame_side)?;
        debug!("Decoded {}x{} frame", frame.width(), frame.height());

        let gate = apply_gate(frame, self.models.enhancer.as_ref(), self.config.low_light_threshold);
        let frame = &gate.frame;

        let (detections, depth) = rayon::join(
            || self.models.detector.detect(frame),
            || self.models.depth.estimate(frame),
        );
        let depth = depth?;
        debug!("Depth grid {}x{}", depth.width(), depth.height());

        let threshold = self.config.confidence_threshold;
        let mut detections: Vec<_> = detections?
            .into_iter()
            .filter(|d| d.confidence >= threshold)
            .collect();

        assign_distances(&mut detections, &depth, &self.tables, &self.config);

        let scene_type = classify_scene(&detections, &self.tables);
        let currency = recognize_currency(&detections, &self.tables);
        let priority = select_priority(&detections, &self.tables);
        let alerts = generate_alerts(&detections, self.config.safety_distance_m);

        if let Some(summary) = currency_summary(&detections, &self.tables) {
            info!("💵 Currency in view: {}", summary);
        }

        let processing_time = round_to(started.elapsed().as_secs_f64(), 3);
        let (priority_object, distance) = match priority {
            Some(p) => (Some(p.label), p.distance),
            None => (None, None),
        };

        info!(
            detections = detections.len(),
            priority = priority_object.as_deref().unwrap_or("-"),
            scene = %scene_type,
            enhanced = gate.enhanced,
            brightness = gate.brightness,
            "Frame analyzed in {:.3}s",
            processing_time
        );

        Ok(AnalysisResult {
            priority_object,
            distance,
            currency,
            scene_type,
            alerts,
            detections,
            enhanced: gate.enhanced,
            processing_time,
        })
    }
}
