//! Diagram session
//!
//! Holds the currently selected diagram: its config, compiled graph and the
//! probes mounted for its nodes. Selecting a diagram is generation-counted so
//! a slow load never overwrites a newer selection.

use crate::diagram::{DiagramConfig, Position};
use crate::graph::{build_zone_nodes, compile, CompiledGraph, ZoneNode};
use crate::loader::DiagramSource;
use crate::overlay::OverlayRefresher;
use crate::positions::{export_layout, PositionMap, PositionStore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct LoadedDiagram {
    pub diagram: String,
    pub config: DiagramConfig,
    pub graph: CompiledGraph,
    /// Drag positions not yet persisted
    pending: PositionMap,
}

#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    Empty,
    Loaded(LoadedDiagram),
    ConfigError { diagram: String, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// A newer selection started before this load finished; its result was dropped
    Superseded,
    Failed(String),
}

/// One entry of a drag batch from the render surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionChange {
    pub id: String,
    pub position: Position,
    /// `false` marks the end of a drag, which flushes pending writes
    #[serde(default)]
    pub dragging: bool,
}

pub struct DiagramSession {
    source: Arc<dyn DiagramSource>,
    positions: PositionStore,
    overlay: Arc<OverlayRefresher>,
    state: RwLock<SessionState>,
    generation: AtomicU64,
    show_coordinates: AtomicBool,
}

impl DiagramSession {
    pub fn new(
        source: Arc<dyn DiagramSource>,
        positions: PositionStore,
        overlay: Arc<OverlayRefresher>,
    ) -> Self {
        Self {
            source,
            positions,
            overlay,
            state: RwLock::new(SessionState::Empty),
            generation: AtomicU64::new(0),
            show_coordinates: AtomicBool::new(false),
        }
    }

    pub fn overlay(&self) -> &Arc<OverlayRefresher> {
        &self.overlay
    }

    /// Load, compile and mount a diagram
    pub async fn select(&self, diagram: &str) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(target: "session", diagram = %diagram, generation, "Selecting diagram");

        let fetched = self.source.fetch(diagram).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(target: "session", diagram = %diagram, "Discarding superseded load");
            return LoadOutcome::Superseded;
        }

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(target: "session", diagram = %diagram, "Discarding superseded load");
            return LoadOutcome::Superseded;
        }

        // Persist mid-drag positions of the outgoing diagram
        if let SessionState::Loaded(previous) = &mut *state {
            self.flush_pending(previous);
        }

        match fetched {
            Ok(config) => {
                let overrides = self.positions.load(diagram);
                let graph = compile(
                    &config,
                    &overrides,
                    self.show_coordinates.load(Ordering::SeqCst),
                );
                self.overlay.sync_nodes(&config.nodes);
                info!(
                    target: "session",
                    diagram = %diagram,
                    nodes = config.nodes.len(),
                    edges = graph.edges.len(),
                    "Diagram loaded"
                );
                *state = SessionState::Loaded(LoadedDiagram {
                    diagram: diagram.to_string(),
                    config,
                    graph,
                    pending: PositionMap::new(),
                });
                LoadOutcome::Loaded
            }
            Err(e) => {
                warn!(target: "session", diagram = %diagram, error = %e, "Failed to load diagram configuration");
                self.overlay.unmount_all();
                let message = e.to_string();
                *state = SessionState::ConfigError {
                    diagram: diagram.to_string(),
                    message: message.clone(),
                };
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Apply one batch of position changes.
    ///
    /// Positions and zones update on every batch; storage is written once per
    /// batch that ends a drag. Returns the recomputed zone nodes.
    pub async fn apply_position_changes(&self, batch: &[PositionChange]) -> Vec<ZoneNode> {
        let mut state = self.state.write().await;
        let SessionState::Loaded(loaded) = &mut *state else {
            return Vec::new();
        };

        let mut moved = false;
        for change in batch {
            if loaded.graph.set_position(&change.id, change.position) {
                loaded.pending.insert(change.id.clone(), change.position);
                moved = true;
            }
        }

        if batch.iter().any(|c| !c.dragging) {
            self.flush_pending(loaded);
        }

        if moved && !loaded.config.zones().is_empty() {
            let zones = build_zone_nodes(loaded.config.zones(), &loaded.graph.content_positions());
            loaded.graph.replace_zones(zones);
        }

        loaded.graph.zone_nodes().cloned().collect()
    }

    /// Best-effort write of unsaved drag positions
    fn flush_pending(&self, loaded: &mut LoadedDiagram) {
        if loaded.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut loaded.pending);
        if let Err(e) = self.positions.merge(&loaded.diagram, &pending) {
            warn!(target: "session", diagram = %loaded.diagram, error = %e, "Failed to persist positions");
        }
    }

    /// Toggle coordinate display; positions are kept
    pub async fn set_show_coordinates(&self, show: bool) {
        self.show_coordinates.store(show, Ordering::SeqCst);
        let mut state = self.state.write().await;
        if let SessionState::Loaded(loaded) = &mut *state {
            let current = loaded.graph.content_positions();
            loaded.graph = compile(&loaded.config, &current, show);
        }
    }

    /// Forget saved positions and fall back to config/grid placement
    pub async fn reset_layout(&self) {
        let mut state = self.state.write().await;
        if let SessionState::Loaded(loaded) = &mut *state {
            if let Err(e) = self.positions.clear(&loaded.diagram) {
                warn!(target: "session", diagram = %loaded.diagram, error = %e, "Failed to clear saved positions");
            }
            loaded.pending.clear();
            loaded.graph = compile(
                &loaded.config,
                &PositionMap::new(),
                self.show_coordinates.load(Ordering::SeqCst),
            );
        }
    }

    /// Current config with saved positions baked in
    pub async fn export_layout(&self) -> Option<DiagramConfig> {
        let state = self.state.read().await;
        match &*state {
            SessionState::Loaded(loaded) => {
                let saved = self.positions.load(&loaded.diagram);
                Some(export_layout(&loaded.config, &saved))
            }
            _ => None,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn graph(&self) -> Option<CompiledGraph> {
        match &*self.state.read().await {
            SessionState::Loaded(loaded) => Some(loaded.graph.clone()),
            _ => None,
        }
    }

    pub async fn current_diagram(&self) -> Option<String> {
        match &*self.state.read().await {
            SessionState::Loaded(loaded) => Some(loaded.diagram.clone()),
            SessionState::ConfigError { diagram, .. } => Some(diagram.clone()),
            SessionState::Empty => None,
        }
    }
}
