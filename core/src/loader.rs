//! Diagram config loading
//!
//! Fetches a diagram document and shape-checks it. Any failure here is a
//! configuration error for the whole view.

use crate::config::AppConfig;
use crate::diagram::DiagramConfig;
use crate::{FlowboardError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Where diagram documents come from
#[async_trait]
pub trait DiagramSource: Send + Sync {
    async fn fetch(&self, file: &str) -> Result<DiagramConfig>;
}

/// `GET {base}/diagrams/{file}`
pub struct HttpDiagramSource {
    http: Client,
    config: AppConfig,
}

impl HttpDiagramSource {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.api.request_timeout_ms))
            .build()
            .map_err(|e| FlowboardError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl DiagramSource for HttpDiagramSource {
    async fn fetch(&self, file: &str) -> Result<DiagramConfig> {
        let url = self.config.diagram_url(file);
        debug!(target: "loader", url = %url, "Fetching diagram");

        let response = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "loader", error = %e, "Diagram request failed");
            FlowboardError::from(e)
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FlowboardError::ConfigNotFound(file.to_string())),
            status if !status.is_success() => Err(FlowboardError::Http(format!(
                "diagram {file} returned status {status}"
            ))),
            _ => {
                let text = response.text().await?;
                DiagramConfig::from_json(&text)
            }
        }
    }
}

/// Reads `{dir}/{file}` from local disk
pub struct FileDiagramSource {
    dir: PathBuf,
}

impl FileDiagramSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, file: &str) -> Result<PathBuf> {
        let relative = Path::new(file);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if file.is_empty() || !plain {
            return Err(FlowboardError::Config(format!("invalid diagram name: {file}")));
        }
        Ok(self.dir.join(relative))
    }
}

#[async_trait]
impl DiagramSource for FileDiagramSource {
    async fn fetch(&self, file: &str) -> Result<DiagramConfig> {
        let path = self.resolve(file)?;
        debug!(target: "loader", path = %path.display(), "Reading diagram");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FlowboardError::ConfigNotFound(file.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        DiagramConfig::from_json(&text)
    }
}
