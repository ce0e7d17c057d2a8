use eyes_core::AnalysisResult;
use metrics::{counter, histogram};
use std::sync::atomic::{AtomicU64, Ordering};

/// Request counters for the analyze endpoint.
///
/// Values are mirrored into the `metrics` facade and kept locally so that
/// `/metrics` can render them without an installed exporter.
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub failures_total: AtomicU64,
    pub enhanced_total: AtomicU64,
    pub detections_total: AtomicU64,
    pub alerts_total: AtomicU64,
    processing_micros_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            failures_total: AtomicU64::new(0),
            enhanced_total: AtomicU64::new(0),
            detections_total: AtomicU64::new(0),
            alerts_total: AtomicU64::new(0),
            processing_micros_total: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self, result: &AnalysisResult) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.detections_total
            .fetch_add(result.detections.len() as u64, Ordering::Relaxed);
        self.alerts_total
            .fetch_add(result.alerts.len() as u64, Ordering::Relaxed);
        self.processing_micros_total
            .fetch_add((result.processing_time * 1_000_000.0) as u64, Ordering::Relaxed);

        counter!("eyes_requests_total").increment(1);
        counter!("eyes_detections_total").increment(result.detections.len() as u64);
        histogram!("eyes_processing_seconds").record(result.processing_time);

        if result.enhanced {
            self.enhanced_total.fetch_add(1, Ordering::Relaxed);
            counter!("eyes_enhanced_total").increment(1);
        }
    }

    pub fn record_failure(&self, code: &'static str) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.failures_total.fetch_add(1, Ordering::Relaxed);

        counter!("eyes_requests_total").increment(1);
        counter!("eyes_failures_total", "code" => code).increment(1);
    }

    pub fn get_prometheus_metrics(&self) -> String {
        let seconds = self.processing_micros_total.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        format!(
            "# HELP eyes_requests_total Analyze requests received\n\
             # TYPE eyes_requests_total counter\n\
             eyes_requests_total {}\n\
             # HELP eyes_failures_total Analyze requests that returned an error\n\
             # TYPE eyes_failures_total counter\n\
             eyes_failures_total {}\n\
             # HELP eyes_enhanced_total Frames passed through low-light enhancement\n\
             # TYPE eyes_enhanced_total counter\n\
             eyes_enhanced_total {}\n\
             # HELP eyes_detections_total Objects reported to clients\n\
             # TYPE eyes_detections_total counter\n\
             eyes_detections_total {}\n\
             # HELP eyes_alerts_total Proximity alerts reported to clients\n\
             # TYPE eyes_alerts_total counter\n\
             eyes_alerts_total {}\n\
             # HELP eyes_processing_seconds_total Pipeline time spent on successful requests\n\
             # TYPE eyes_processing_seconds_total counter\n\
             eyes_processing_seconds_total {:.6}\n",
            self.requests_total.load(Ordering::Relaxed),
            self.failures_total.load(Ordering::Relaxed),
            self.enhanced_total.load(Ordering::Relaxed),
            self.detections_total.load(Ordering::Relaxed),
            self.alerts_total.load(Ordering::Relaxed),
            seconds,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(enhanced: bool, alerts: usize) -> AnalysisResult {
        AnalysisResult {
            priority_object: None,
            distance: None,
            currency: None,
            scene_type: "Unknown".to_string(),
            alerts: vec!["car nearby – 1.0m".to_string(); alerts],
            detections: vec![],
            enhanced,
            processing_time: 0.25,
        }
    }

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.record_success(&result(true, 2));
        metrics.record_success(&result(false, 0));
        metrics.record_failure("INVALID_INPUT");

        assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.failures_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.enhanced_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.alerts_total.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_prometheus_text() {
        let metrics = Metrics::new();
        metrics.record_success(&result(false, 1));

        let text = metrics.get_prometheus_metrics();
        assert!(text.contains("# TYPE eyes_requests_total counter"));
        assert!(text.contains("eyes_requests_total 1\n"));
        assert!(text.contains("eyes_failures_total 0\n"));
        assert!(text.contains("eyes_processing_seconds_total 0.250000\n"));
    }
}
