// One-time startup: logging and model acquisition

use eyes_core::EyesConfig;
use eyes_vision::{ModelManager, VisionError, VisionPipeline};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` from the configuration.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

/// Fetch missing weights, open every session and build the shared pipeline.
pub async fn load_pipeline(config: &EyesConfig) -> Result<VisionPipeline, VisionError> {
    let manager = ModelManager::new(config.models.clone());

    info!("📦 Checking model weights...");
    manager.ensure_all().await?;

    info!("🧠 Loading models (detector, low-light enhancer, {} depth)...", config.models.midas_model_type);
    let models = manager.load_models(&config.processing)?;
    info!("✅ Models ready");

    Ok(VisionPipeline::new(
        models,
        config.processing.clone(),
        Arc::new(config.labels.clone()),
    ))
}
