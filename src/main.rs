use anyhow::{Context, Result};
use clap::Parser;
use interview_relay::config::StorageBackend;
use interview_relay::{
    create_router, AppState, Config, ConnectionRegistry, InterviewService, JsonFileRepository,
    MemoryRepository, PipelineClient, SessionRepository, SessionStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "interview-relay", about = "Session lifecycle and real-time relay for the interview bot")]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/interview-relay")]
    config: String,

    /// Override the HTTP port from config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let repository: Arc<dyn SessionRepository> = match cfg.storage.backend {
        StorageBackend::File => {
            info!("Storage path: {}", cfg.storage.path);
            Arc::new(
                JsonFileRepository::open(&cfg.storage.path)
                    .await
                    .context("Failed to open session storage")?,
            )
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; sessions will not survive a restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let store = Arc::new(SessionStore::new(repository));
    let registry = ConnectionRegistry::new(Arc::clone(&store), cfg.relay.queue_warn_depth);

    let pipeline = match &cfg.pipeline.nats_url {
        Some(url) => Some(Arc::new(
            PipelineClient::connect(url, &cfg.pipeline.subject_prefix).await?,
        )),
        None => {
            info!("No pipeline NATS URL configured; relay events must be fed in-process");
            None
        }
    };

    let service = Arc::new(InterviewService::new(store, Arc::clone(&registry), pipeline));
    let app = create_router(AppState::new(service));

    let bind = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Server listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Server shutting down...");
        })
        .await
        .context("HTTP server failed")?;

    registry.close_all().await;
    Ok(())
}
