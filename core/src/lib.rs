// Flowboard Core Library
// Pipeline diagram compiler and live status overlay runtime

pub mod config;
pub mod dashboard;
pub mod diagram;
pub mod graph;
pub mod loader;
pub mod node_details;
pub mod overlay;
pub mod positions;
pub mod session;
pub mod settings;
pub mod storage;
pub mod telemetry;

// Export core types
pub use config::AppConfig;
pub use dashboard::{DashboardConfig, DashboardServer};
pub use diagram::{Connection, DiagramConfig, DiagramNode, Position, Zone};
pub use graph::{compile, CompiledGraph, GraphCompiler};
pub use loader::{DiagramSource, FileDiagramSource, HttpDiagramSource};
pub use node_details::{
    HttpNodeDetailsSource, NodeDetailConfig, NodeDetailsCache, NodeDetailsSource,
};
pub use overlay::{HttpProbeFetcher, OverlayRefresher, OverlaySettings, ProbeFetcher, ProbeReading};
pub use positions::{PositionMap, PositionStore};
pub use session::{DiagramSession, LoadOutcome, PositionChange, SessionState};
pub use settings::ParticleSettings;
pub use storage::{InMemoryStore, KeyValueStore, RocksDbStore};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Diagram not found: {0}")]
    ConfigNotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FlowboardError {
    fn from(e: reqwest::Error) -> Self {
        FlowboardError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowboardError>;
