// Configuration system for the EYES backend
//
// Load order: built-in defaults, then an optional config file (JSON, TOML or
// YAML), then environment variables. The result is validated once at startup
// and never changes afterwards.

use crate::labels::LabelTables;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable naming an optional config file
pub const CONFIG_PATH_ENV: &str = "EYES_CONFIG";

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the request body, multipart framing included
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Where a model's weights live, and optionally where to fetch them from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    pub path: PathBuf,
    /// HTTPS location used when `path` does not exist yet
    #[serde(default)]
    pub url: Option<String>,
    /// Expected SHA-256 of the file, hex encoded
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ModelSource {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            url: None,
            sha256: None,
        }
    }

    /// File name of the weights, used as the model's identity in logs
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// MiDaS flavour; decides input resolution and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidasVariant {
    #[serde(rename = "MiDaS_small")]
    Small,
    #[serde(rename = "DPT_Large")]
    DptLarge,
    #[serde(rename = "DPT_Hybrid")]
    DptHybrid,
}

impl MidasVariant {
    /// Square input edge expected by the network
    pub fn input_size(&self) -> u32 {
        match self {
            MidasVariant::Small => 256,
            MidasVariant::DptLarge | MidasVariant::DptHybrid => 384,
        }
    }

    /// Per-channel (mean, std) applied after scaling pixels to [0, 1]
    pub fn normalization(&self) -> ([f32; 3], [f32; 3]) {
        match self {
            MidasVariant::Small => ([0.485, 0.456, 0.406], [0.229, 0.224, 0.225]),
            MidasVariant::DptLarge | MidasVariant::DptHybrid => ([0.5; 3], [0.5; 3]),
        }
    }
}

impl fmt::Display for MidasVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidasVariant::Small => write!(f, "MiDaS_small"),
            MidasVariant::DptLarge => write!(f, "DPT_Large"),
            MidasVariant::DptHybrid => write!(f, "DPT_Hybrid"),
        }
    }
}

impl FromStr for MidasVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MiDaS_small" => Ok(MidasVariant::Small),
            "DPT_Large" => Ok(MidasVariant::DptLarge),
            "DPT_Hybrid" => Ok(MidasVariant::DptHybrid),
            other => Err(ConfigError::InvalidValue {
                key: "MIDAS_MODEL_TYPE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Model weights and detector input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub yolo: ModelSource,
    /// One class name per line; COCO names when unset
    pub yolo_labels_path: Option<PathBuf>,
    pub zero_dce: ModelSource,
    pub midas: ModelSource,
    pub midas_model_type: MidasVariant,
    /// Detector input edge in pixels
    pub image_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            yolo: ModelSource::at("models/yolov8n.onnx"),
            yolo_labels_path: None,
            zero_dce: ModelSource::at("models/zero_dce.onnx"),
            midas: ModelSource::at("models/midas_small.onnx"),
            midas_model_type: MidasVariant::Small,
            image_size: 640,
        }
    }
}

/// Thresholds and calibration constants used by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Mean normalized luminance below which the enhancer runs
    pub low_light_threshold: f32,
    /// Focal length in pixels at `reference_height_px`
    pub focal_length_px: f32,
    pub reference_height_px: f32,
    /// Objects closer than this (meters) raise an alert
    pub safety_distance_m: f32,
    /// Largest accepted frame edge in pixels
    pub max_frame_side: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.35,
            iou_threshold: 0.45,
            low_light_threshold: 0.35,
            focal_length_px: 500.0,
            reference_height_px: 640.0,
            safety_distance_m: 3.0,
            max_frame_side: 8192,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyesConfig {
    pub server: ServerConfig,
    pub models: ModelConfig,
    pub processing: ProcessingConfig,
    pub labels: LabelTables,
    pub log_level: String,
}

impl Default for EyesConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: ModelConfig::default(),
            processing: ProcessingConfig::default(),
            labels: LabelTables::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EyesConfig {
    /// Defaults, then `path` (if any), then the process environment; validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from string, trying JSON, TOML then YAML
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        if let Ok(config) = serde_json::from_str::<EyesConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<EyesConfig>(content) {
            return Ok(config);
        }

        serde_yaml::from_str::<EyesConfig>(content)
            .map_err(|e| ConfigError::Parse(format!("not valid JSON, TOML or YAML: {}", e)))
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&get, "PORT")? {
            self.server.port = port;
        }
        if let Some(limit) = parse_var(&get, "MAX_UPLOAD_BYTES")? {
            self.server.max_upload_bytes = limit;
        }

        if let Some(path) = get("YOLO_MODEL_PATH") {
            self.models.yolo.path = PathBuf::from(path);
        }
        if let Some(url) = get("YOLO_MODEL_URL") {
            self.models.yolo.url = Some(url);
        }
        if let Some(path) = get("YOLO_LABELS_PATH") {
            self.models.yolo_labels_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get("ZERO_DCE_MODEL_PATH") {
            self.models.zero_dce.path = PathBuf::from(path);
        }
        if let Some(url) = get("ZERO_DCE_MODEL_URL") {
            self.models.zero_dce.url = Some(url);
        }
        if let Some(path) = get("MIDAS_MODEL_PATH") {
            self.models.midas.path = PathBuf::from(path);
        }
        if let Some(url) = get("MIDAS_MODEL_URL") {
            self.models.midas.url = Some(url);
        }
        if let Some(variant) = parse_var(&get, "MIDAS_MODEL_TYPE")? {
            self.models.midas_model_type = variant;
        }
        if let Some(size) = parse_var(&get, "IMAGE_SIZE")? {
            self.models.image_size = size;
        }

        let processing = &mut self.processing;
        if let Some(v) = parse_var(&get, "CONFIDENCE_THRESHOLD")? {
            processing.confidence_threshold = v;
        }
        if let Some(v) = parse_var(&get, "IOU_THRESHOLD")? {
            processing.iou_threshold = v;
        }
        if let Some(v) = parse_var(&get, "LOW_LIGHT_THRESHOLD")? {
            processing.low_light_threshold = v;
        }
        if let Some(v) = parse_var(&get, "FOCAL_LENGTH_PX")? {
            processing.focal_length_px = v;
        }
        if let Some(v) = parse_var(&get, "SAFETY_DISTANCE_M")? {
            processing.safety_distance_m = v;
        }

        if let Some(level) = get("EYES_LOG_LEVEL") {
            self.log_level = level;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.processing;
        for (name, value) in [
            ("confidence_threshold", p.confidence_threshold),
            ("iou_threshold", p.iou_threshold),
            ("low_light_threshold", p.low_light_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if !p.focal_length_px.is_finite() || p.focal_length_px <= 0.0 {
            return Err(ConfigError::Validation("focal_length_px must be positive".to_string()));
        }
        if !p.reference_height_px.is_finite() || p.reference_height_px <= 0.0 {
            return Err(ConfigError::Validation(
                "reference_height_px must be positive".to_string(),
            ));
        }
        if !p.safety_distance_m.is_finite() || p.safety_distance_m <= 0.0 {
            return Err(ConfigError::Validation("safety_distance_m must be positive".to_string()));
        }
        if p.max_frame_side == 0 {
            return Err(ConfigError::Validation("max_frame_side cannot be 0".to_string()));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes cannot be 0".to_string(),
            ));
        }

        let size = self.models.image_size;
        if size == 0 || size % 32 != 0 {
            return Err(ConfigError::Validation(format!(
                "models.image_size must be a positive multiple of 32, got {}",
                size
            )));
        }

        self.labels.validate().map_err(ConfigError::Validation)?;

        Ok(())
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = EyesConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.processing.confidence_threshold, 0.35);
        assert_eq!(config.processing.low_light_threshold, 0.35);
        assert_eq!(config.processing.focal_length_px, 500.0);
        assert_eq!(config.processing.safety_distance_m, 3.0);
        assert_eq!(config.models.midas_model_type, MidasVariant::Small);
        assert_eq!(config.models.image_size, 640);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EyesConfig::default();
        config
            .apply_overrides(lookup(&[
                ("PORT", "9001"),
                ("YOLO_MODEL_PATH", "/srv/models/custom.onnx"),
                ("ZERO_DCE_MODEL_PATH", "/srv/models/dce.onnx"),
                ("MIDAS_MODEL_TYPE", "DPT_Hybrid"),
                ("CONFIDENCE_THRESHOLD", "0.5"),
                ("LOW_LIGHT_THRESHOLD", "0.2"),
                ("FOCAL_LENGTH_PX", "600"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.models.yolo.path, PathBuf::from("/srv/models/custom.onnx"));
        assert_eq!(config.models.zero_dce.path, PathBuf::from("/srv/models/dce.onnx"));
        assert_eq!(config.models.midas_model_type, MidasVariant::DptHybrid);
        assert_eq!(config.processing.confidence_threshold, 0.5);
        assert_eq!(config.processing.low_light_threshold, 0.2);
        assert_eq!(config.processing.focal_length_px, 600.0);
    }

    #[test]
    fn test_env_blank_values_ignored() {
        let mut config = EyesConfig::default();
        config.apply_overrides(lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_invalid_value_rejected() {
        let mut config = EyesConfig::default();
        let err = config
            .apply_overrides(lookup(&[("CONFIDENCE_THRESHOLD", "high")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CONFIDENCE_THRESHOLD"));

        let err = config
            .apply_overrides(lookup(&[("MIDAS_MODEL_TYPE", "MiDaS_huge")]))
            .unwrap_err();
        assert!(err.to_string().contains("MiDaS_huge"));
    }

    #[test]
    fn test_validation_thresholds() {
        let mut config = EyesConfig::default();
        config.processing.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = EyesConfig::default();
        config.processing.low_light_threshold = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = EyesConfig::default();
        config.processing.focal_length_px = 0.0;
        assert!(config.validate().is_err());

        let mut config = EyesConfig::default();
        config.processing.safety_distance_m = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_server_and_models() {
        let mut config = EyesConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = EyesConfig::default();
        config.models.image_size = 630;
        assert!(config.validate().is_err());

        let mut config = EyesConfig::default();
        config.models.image_size = 320;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EyesConfig::from_str(
            r#"
log_level = "debug"

[processing]
safety_distance_m = 2.0

[models.yolo]
path = "weights/peso.onnx"
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.processing.safety_distance_m, 2.0);
        assert_eq!(config.processing.confidence_threshold, 0.35);
        assert_eq!(config.models.yolo.path, PathBuf::from("weights/peso.onnx"));
        assert_eq!(config.labels, LabelTables::default());
    }

    #[test]
    fn test_yaml_and_json_formats() {
        let yaml = EyesConfig::from_str("server:\n  port: 7000\nmodels:\n  midas_model_type: DPT_Large\n").unwrap();
        assert_eq!(yaml.server.port, 7000);
        assert_eq!(yaml.models.midas_model_type, MidasVariant::DptLarge);

        let json = EyesConfig::from_str(r#"{"labels": {"default_scene": "Somewhere"}}"#).unwrap();
        assert_eq!(json.labels.default_scene, "Somewhere");
        assert!(!json.labels.scene_rules.is_empty());
    }

    #[test]
    fn test_garbage_config_rejected() {
        assert!(matches!(
            EyesConfig::from_str("server: [unclosed"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8123").unwrap();

        let config = EyesConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8123);

        let missing = EyesConfig::from_file(Path::new("/nonexistent/eyes.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_midas_variant_parameters() {
        assert_eq!(MidasVariant::Small.input_size(), 256);
        assert_eq!(MidasVariant::DptLarge.input_size(), 384);
        assert_eq!("DPT_Large".parse::<MidasVariant>().unwrap(), MidasVariant::DptLarge);
        assert_eq!(MidasVariant::DptHybrid.to_string(), "DPT_Hybrid");
        let (mean, std) = MidasVariant::DptLarge.normalization();
        assert_eq!(mean, [0.5; 3]);
        assert_eq!(std, [0.5; 3]);
    }
}
