// Dashboard HTTP API server
//
// REST endpoints over the diagram session plus SSE for live overlay updates

use crate::dashboard::event_stream::dashboard_events;
use crate::dashboard::DashboardConfig;
use crate::node_details::NodeDetailsCache;
use crate::session::{DiagramSession, LoadOutcome, PositionChange, SessionState};
use crate::settings::ParticleSettings;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Dashboard server state
#[derive(Clone)]
struct DashboardState {
    session: Arc<DiagramSession>,
    settings: Arc<ParticleSettings>,
    details: NodeDetailsCache,
}

/// Dashboard HTTP server
pub struct DashboardServer {
    config: DashboardConfig,
    state: DashboardState,
}

impl DashboardServer {
    pub fn new(
        config: DashboardConfig,
        session: Arc<DiagramSession>,
        settings: Arc<ParticleSettings>,
        details: NodeDetailsCache,
    ) -> Self {
        Self {
            config,
            state: DashboardState {
                session,
                settings,
                details,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/graph", get(graph_handler))
            .route("/api/graph/select", post(select_handler))
            .route("/api/graph/positions", post(positions_handler))
            .route("/api/graph/show-coordinates", post(show_coordinates_handler))
            .route("/api/graph/reset-layout", post(reset_layout_handler))
            .route("/api/graph/layout", get(layout_handler))
            .route("/api/overlay", get(overlay_handler))
            .route("/api/overlay/stream", get(overlay_stream_handler))
            .route("/api/overlay/refresh", post(refresh_handler))
            .route(
                "/api/settings/particles",
                get(particles_handler).put(update_particles_handler),
            )
            .route("/api/details/:name", get(details_handler))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }

    /// Start the Dashboard server
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr();
        info!(target: "dashboard", addr = %addr, "Starting Dashboard server");

        let listener = TcpListener::bind(&addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.router();
        let local = listener.local_addr()?;
        info!(target: "dashboard", url = %format!("http://{}", local), "Dashboard server ready");

        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Compiled graph of the selected diagram
async fn graph_handler(State(state): State<DashboardState>) -> Response {
    match state.session.state().await {
        SessionState::Loaded(loaded) => Json(loaded.graph).into_response(),
        SessionState::ConfigError { diagram, message } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": message, "diagram": diagram })),
        )
            .into_response(),
        SessionState::Empty => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "No diagram selected")
        }
    }
}

#[derive(Deserialize)]
struct SelectRequest {
    file: String,
}

async fn select_handler(
    State(state): State<DashboardState>,
    Json(request): Json<SelectRequest>,
) -> Response {
    match state.session.select(&request.file).await {
        LoadOutcome::Loaded => {
            Json(json!({ "status": "loaded", "file": request.file })).into_response()
        }
        LoadOutcome::Superseded => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "superseded", "file": request.file })),
        )
            .into_response(),
        LoadOutcome::Failed(message) => error_response(StatusCode::UNPROCESSABLE_ENTITY, message),
    }
}

/// Apply a drag batch; responds with the recomputed zones
async fn positions_handler(
    State(state): State<DashboardState>,
    Json(batch): Json<Vec<PositionChange>>,
) -> impl IntoResponse {
    Json(state.session.apply_position_changes(&batch).await)
}

#[derive(Deserialize)]
struct ShowCoordinatesRequest {
    show: bool,
}

async fn show_coordinates_handler(
    State(state): State<DashboardState>,
    Json(request): Json<ShowCoordinatesRequest>,
) -> StatusCode {
    state.session.set_show_coordinates(request.show).await;
    StatusCode::NO_CONTENT
}

async fn reset_layout_handler(State(state): State<DashboardState>) -> Response {
    state.session.reset_layout().await;
    match state.session.graph().await {
        Some(graph) => Json(graph).into_response(),
        None => error_response(StatusCode::SERVICE_UNAVAILABLE, "No diagram loaded"),
    }
}

/// Selected diagram config with saved positions applied
async fn layout_handler(State(state): State<DashboardState>) -> Response {
    match state.session.export_layout().await {
        Some(config) => Json(config).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No diagram loaded"),
    }
}

async fn overlay_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.session.overlay().snapshot())
}

/// SSE endpoint for overlay readings and settings changes
async fn overlay_stream_handler(
    State(state): State<DashboardState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    info!(target: "dashboard", "New SSE client connected");
    let stream = dashboard_events(state.session.overlay(), &state.settings);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct RefreshQuery {
    node: Option<String>,
}

/// Force an immediate tick, for one node or all of them
async fn refresh_handler(
    State(state): State<DashboardState>,
    Query(query): Query<RefreshQuery>,
) -> impl IntoResponse {
    let overlay = state.session.overlay();
    let triggered = match &query.node {
        Some(node) => overlay.refresh_node(node),
        None => overlay.refresh_all(),
    };
    Json(json!({ "triggered": triggered }))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticleSettingsBody {
    max_particles: u32,
}

async fn particles_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(ParticleSettingsBody {
        max_particles: state.settings.max_particles(),
    })
}

async fn update_particles_handler(
    State(state): State<DashboardState>,
    Json(body): Json<ParticleSettingsBody>,
) -> impl IntoResponse {
    let max_particles = state.settings.set_max_particles(body.max_particles);
    Json(ParticleSettingsBody { max_particles })
}

async fn details_handler(
    State(state): State<DashboardState>,
    Path(name): Path<String>,
) -> Response {
    match state.details.get_or_fetch(&name).await {
        Ok(Some(details)) => Json(details).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("No details for {name}")),
        Err(e) => {
            warn!(target: "dashboard", node = %name, error = %e, "Node details unavailable");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
