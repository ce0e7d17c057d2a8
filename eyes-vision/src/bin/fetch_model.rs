//! Binary for downloading vision models from command line

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use eyes_core::{EyesConfig, MidasVariant, ModelSource};
use eyes_vision::ModelManager;
use std::path::PathBuf;

/// Published MiDaS v2.1 small export
const MIDAS_SMALL_URL: &str = "https://github.com/isl-org/MiDaS/releases/download/v2_1/model-small.onnx";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelKind {
    Yolo,
    ZeroDce,
    Midas,
}

#[derive(Debug, Parser)]
#[command(name = "fetch-model", about = "Download a model to its configured path")]
struct Args {
    /// Which model to fetch
    #[arg(value_enum)]
    model: ModelKind,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, env = "EYES_CONFIG")]
    config: Option<PathBuf>,

    /// Override the download URL
    #[arg(long)]
    url: Option<String>,

    /// Expected SHA-256 of the file
    #[arg(long)]
    sha256: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = EyesConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let mut source: ModelSource = match args.model {
        ModelKind::Yolo => config.models.yolo.clone(),
        ModelKind::ZeroDce => config.models.zero_dce.clone(),
        ModelKind::Midas => config.models.midas.clone(),
    };

    if let Some(url) = args.url {
        source.url = Some(url);
    }
    if let Some(sha256) = args.sha256 {
        source.sha256 = Some(sha256);
    }
    if source.url.is_none()
        && matches!(args.model, ModelKind::Midas)
        && config.models.midas_model_type == MidasVariant::Small
    {
        source.url = Some(MIDAS_SMALL_URL.to_string());
    }
    if source.url.is_none() && !source.path.is_file() {
        bail!(
            "No download URL for {:?}; pass --url or set it in the configuration",
            args.model
        );
    }

    let manager = ModelManager::new(config.models);
    let path = manager.ensure_model(&source).await?;
    println!("Model ready at: {}", path.display());

    Ok(())
}
