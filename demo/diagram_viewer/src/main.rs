use flowboard_core::telemetry::init_logging;
use flowboard_core::{
    AppConfig, DashboardServer, DiagramSession, DiagramSource, FileDiagramSource,
    HttpDiagramSource, HttpNodeDetailsSource, HttpProbeFetcher, InMemoryStore, KeyValueStore,
    LoadOutcome, NodeDetailsCache, OverlayRefresher, OverlaySettings, ParticleSettings,
    PositionStore, RocksDbStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Defaults + env + optional TOML overlay
    let cfg = AppConfig::load();
    init_logging(&cfg.development.log_level);

    info!(
        target: "diagram_viewer",
        api = %cfg.api.base_url,
        diagram = %cfg.diagram,
        "Starting diagram viewer"
    );

    let store: Arc<dyn KeyValueStore> = match &cfg.storage_path {
        Some(path) => Arc::new(RocksDbStore::open(path)?),
        None => {
            warn!(target: "diagram_viewer", "No storage path configured; layouts will not survive restarts");
            Arc::new(InMemoryStore::new())
        }
    };

    let source: Arc<dyn DiagramSource> = match &cfg.diagrams_dir {
        Some(dir) => Arc::new(FileDiagramSource::new(dir.clone())),
        None => Arc::new(HttpDiagramSource::new(cfg.clone())?),
    };

    let overlay = Arc::new(OverlayRefresher::new(
        Arc::new(HttpProbeFetcher::new(cfg.clone())?),
        OverlaySettings {
            metric_interval: Duration::from_millis(cfg.metric_interval_ms),
            mock_mode: cfg.development.enable_mock_data,
        },
    ));
    let session = Arc::new(DiagramSession::new(
        source,
        PositionStore::new(store.clone()),
        overlay.clone(),
    ));
    let settings = Arc::new(ParticleSettings::load(store));
    let details = NodeDetailsCache::new(Arc::new(HttpNodeDetailsSource::new(cfg.clone())?));

    match session.select(&cfg.diagram).await {
        LoadOutcome::Loaded => {
            info!(target: "diagram_viewer", probes = overlay.active_probes(), "Diagram ready")
        }
        LoadOutcome::Failed(message) => {
            error!(target: "diagram_viewer", error = %message, "Initial diagram failed to load")
        }
        LoadOutcome::Superseded => {}
    }

    let server = DashboardServer::new(cfg.dashboard.clone(), session, settings, details);
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            error!(target: "diagram_viewer", error = %e, "Dashboard server stopped");
        }
    });

    signal::ctrl_c().await?;
    info!(target: "diagram_viewer", "Shutting down...");

    server_task.abort();
    overlay.unmount_all();
    Ok(())
}
