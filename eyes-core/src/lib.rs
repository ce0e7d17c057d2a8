//! eyes-core: shared data model and configuration for the EYES vision backend.
//!
//! Everything here is plain data: the detection/result types that travel from
//! the inference adapters to the JSON response, the label tables that drive
//! post-processing, and the service configuration.

pub mod config;
pub mod labels;
pub mod types;

pub use config::{
    ConfigError, EyesConfig, MidasVariant, ModelConfig, ModelSource, ProcessingConfig,
    ServerConfig,
};
pub use labels::{CurrencyDenomination, LabelTables, SceneRule, SemanticWeights};
pub use types::{AnalysisResult, BoundingBox, Detection};
