//! Model manager with auto-download functionality

use crate::error::VisionError;
use crate::models::{MidasModel, ModelSet, YoloModel, ZeroDceModel};
use crate::models::yolo::DecodeParams;
use eyes_core::{ModelConfig, ModelSource, ProcessingConfig};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB max
const MIN_MODEL_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600; // 1 hour max

/// Resolves model weights on disk, downloading them when a source is
/// configured, and opens the inference sessions.
pub struct ModelManager {
    config: ModelConfig,
}

impl ModelManager {
    /// Create a new model manager
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Make sure every configured model file is present.
    pub async fn ensure_all(&self) -> Result<(), VisionError> {
        for source in [&self.config.yolo, &self.config.zero_dce, &self.config.midas] {
            self.ensure_model(source).await?;
        }
        Ok(())
    }

    /// Download model if not present
    pub async fn ensure_model(&self, source: &ModelSource) -> Result<PathBuf, VisionError> {
        let model_name = source.file_name();
        validate_model_name(&model_name)?;

        if source.path.is_file() {
            info!("Model {} already exists at {:?}", model_name, source.path);
            return Ok(source.path.clone());
        }

        let Some(url) = source.url.as_deref() else {
            return Err(VisionError::ModelUnavailable(format!(
                "Model {} not found at {:?} and no download URL is configured",
                model_name, source.path
            )));
        };
        validate_url(url)?;

        if let Some(parent) = source.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created model directory: {:?}", parent);
            }
        }

        info!("Downloading model {} from {}", model_name, url);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::ModelUnavailable(format!(
                "Failed to download model {}: HTTP {}",
                model_name,
                response.status()
            )));
        }

        // Check content length
        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE as u64 {
                return Err(VisionError::ModelUnavailable(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }

        let bytes = response.bytes().await?;
        verify_payload(&model_name, &bytes, source.sha256.as_deref())?;
        write_atomically(&source.path, &bytes)?;

        info!("Model {} saved to {:?}", model_name, source.path);
        Ok(source.path.clone())
    }

    /// Open all three sessions. Any failure is fatal for the caller.
    pub fn load_models(&self, processing: &ProcessingConfig) -> Result<ModelSet, VisionError> {
        let labels = YoloModel::load_labels(self.config.yolo_labels_path.as_deref())?;
        let detector = YoloModel::new(
            &self.config.yolo.path,
            labels,
            self.config.image_size,
            DecodeParams {
                confidence_threshold: processing.confidence_threshold,
                iou_threshold: processing.iou_threshold,
            },
        )?;
        let enhancer = ZeroDceModel::new(&self.config.zero_dce.path)?;
        let depth = MidasModel::new(&self.config.midas.path, self.config.midas_model_type)?;

        Ok(ModelSet::new(Arc::new(enhancer), Arc::new(detector), Arc::new(depth)))
    }
}

fn validate_model_name(model_name: &str) -> Result<(), VisionError> {
    if model_name.is_empty() || model_name.len() > 255 {
        return Err(VisionError::ModelUnavailable(format!(
            "Invalid model name '{}'",
            model_name
        )));
    }

    // Prevent path traversal attacks
    if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
        return Err(VisionError::ModelUnavailable(
            "Model name contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

fn validate_url(url: &str) -> Result<(), VisionError> {
    if url.is_empty() || url.len() > 2048 {
        return Err(VisionError::ModelUnavailable("Invalid model URL".to_string()));
    }

    if !url.starts_with("https://") {
        return Err(VisionError::ModelUnavailable(
            "Only HTTPS URLs are allowed for model downloads".to_string(),
        ));
    }

    Ok(())
}

/// Size bounds and optional SHA-256 check on a downloaded model.
fn verify_payload(model_name: &str, bytes: &[u8], checksum: Option<&str>) -> Result<(), VisionError> {
    if bytes.len() > MAX_MODEL_SIZE {
        return Err(VisionError::ModelUnavailable(format!(
            "Downloaded model too large: {} bytes (max {} bytes)",
            bytes.len(),
            MAX_MODEL_SIZE
        )));
    }

    // Minimum size check (prevent empty/corrupted files)
    if bytes.len() < MIN_MODEL_SIZE {
        return Err(VisionError::ModelUnavailable(
            "Downloaded file too small, likely corrupted".to_string(),
        ));
    }

    match checksum.map(str::trim).filter(|c| !c.is_empty()) {
        Some(expected) => {
            let computed = hex::encode(Sha256::digest(bytes));
            if !computed.eq_ignore_ascii_case(expected) {
                return Err(VisionError::ModelUnavailable(format!(
                    "Checksum mismatch for model {}: expected {}, got {}",
                    model_name, expected, computed
                )));
            }
            info!("Verified checksum for model {}", model_name);
        }
        None => {
            warn!(
                "Downloaded {} bytes for model {} (checksum verification skipped)",
                bytes.len(),
                model_name
            );
        }
    }

    Ok(())
}

/// Write to a sibling temp file first, then rename over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), VisionError> {
    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".part");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, bytes)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        // Clean up temp file on error
        let _ = fs::remove_file(&temp_path);
        return Err(VisionError::Io(e));
    }

    Ok(())
}
