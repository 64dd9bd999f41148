// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tessera — Data-Mesh API Gateway
//
//  Request path:  axum shell → OpenAPI-driven forwarder → join engine
//  Registry:      in-memory, seeded from YAML config
//  Config:        YAML file + TESSERA_* environment overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::Parser;
use tessera_server::app::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tessera_core::TesseraConfig;
use tessera_gateway::UpstreamClient;
use tessera_registry::MemoryRegistry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera — Data-Mesh API Gateway")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Tessera starting");

    // ── Config ──
    let config = TesseraConfig::load(cli.config.as_deref())?;

    // ── Registry ──
    let registry = MemoryRegistry::from_seed(config.registry.clone());
    info!(
        modules = config.registry.modules.len(),
        models = config.registry.models.len(),
        relationships = config.registry.relationships.len(),
        "Registry loaded"
    );

    // ── Gateway shell ──
    let client = UpstreamClient::new(&config.gateway)
        .map_err(|e| anyhow::anyhow!("failed to build upstream client: {e}"))?;
    let addr = config.server.addr;
    let state = AppState {
        registry: Arc::new(registry),
        client,
        config: Arc::new(config),
    };
    let router = app::build_router(state);

    info!(addr = %addr, "Tessera is ready — serving traffic");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tessera stopped");
    Ok(())
}

async fn shutdown_signal() {
    // SIGTERM (docker stop) + SIGINT (Ctrl+C)
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received, stopping...");
}
