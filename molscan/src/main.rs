use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use molscan::api::{create_router, AppState};
use molscan::config::Config;
use molscan::engines::EngineRegistry;
use molscan::storage::ContentStore;

#[derive(Parser)]
#[command(name = "molscan")]
#[command(about = "Content-addressed image store with parallel chemical structure recognition")]
struct Args {
    /// Directory holding stored images (overrides MOLSCAN_WORK_DIR)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Port to listen on (overrides MOLSCAN_PORT)
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "molscan=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(work_dir) = args.work_dir {
        config.storage.work_dir = work_dir;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(
        "Opening content store at {}...",
        config.storage.work_dir.display()
    );
    let store = ContentStore::open(&config.storage.work_dir).await?;

    tracing::info!(
        "Initializing {} recognition engine(s)...",
        config.recognition.engines.len()
    );
    let registry = EngineRegistry::from_config(&config.recognition)?;

    let state = AppState::new(config.clone(), store, registry)?;
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Molscan starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  API docs:     http://{}/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, draining connections...");
}
