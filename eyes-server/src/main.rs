// EYES backend: camera frame in, navigation summary out

use anyhow::Context;
use clap::Parser;
use eyes_core::EyesConfig;
use eyes_server::http::{create_router, ApiState};
use eyes_server::metrics::Metrics;
use eyes_server::startup::{init_tracing, load_pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "eyes-server", about = "Assistive vision backend")]
struct Args {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, env = "EYES_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on; overrides configuration and PORT
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind; overrides configuration and HOST
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = EyesConfig::load(args.config.as_deref()).context("Invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.log_level);
    info!("🚀 Starting EYES backend...");

    // Missing or broken weights stop the process here
    let pipeline = Arc::new(load_pipeline(&config).await.context("Failed to load models")?);

    let state = ApiState::new(pipeline.clone(), Arc::new(Metrics::new()), config.server.max_upload_bytes);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;

    info!("✅ HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("HTTP server failed")?;

    info!("🔄 Releasing models...");
    drop(pipeline);
    info!("✅ Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
