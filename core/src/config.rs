use std::fs;
use std::path::{Path, PathBuf};

use url::{form_urlencoded, Url};

use crate::dashboard::DashboardConfig;

/// Runtime configuration for the dashboard client
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub development: DevelopmentConfig,
    /// Refresh period of data-grid metric probes
    pub metric_interval_ms: u64,
    /// Diagram file selected at startup
    pub diagram: String,
    /// Serve diagrams from this directory instead of the HTTP API
    pub diagrams_dir: Option<PathBuf>,
    /// RocksDB directory for saved layouts and settings; in-memory when unset
    pub storage_path: Option<PathBuf>,
    pub dashboard: DashboardConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub metrics_endpoint: String,
    pub diagrams_endpoint: String,
    pub node_details_endpoint: String,
    pub request_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct DevelopmentConfig {
    /// Report failed probes as healthy with a "Mocked" annotation. Never enable in production.
    pub enable_mock_data: bool,
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("FLOWBOARD_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://localhost:8080/api".to_string()),
            metrics_endpoint: "/metrics".to_string(),
            diagrams_endpoint: "/diagrams".to_string(),
            node_details_endpoint: "/node-details".to_string(),
            request_timeout_ms: std::env::var("FLOWBOARD_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10_000),
        }
    }
}

impl Default for DevelopmentConfig {
    fn default() -> Self {
        Self {
            enable_mock_data: std::env::var("FLOWBOARD_ENABLE_MOCK_DATA")
                .map(|v| v == "true")
                .unwrap_or(false),
            log_level: std::env::var("FLOWBOARD_LOG_LEVEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "info".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            development: DevelopmentConfig::default(),
            metric_interval_ms: std::env::var("FLOWBOARD_METRIC_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
            diagram: std::env::var("FLOWBOARD_DIAGRAM")
                .unwrap_or_else(|_| "diagram-config.json".to_string()),
            diagrams_dir: std::env::var("FLOWBOARD_DIAGRAMS_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            storage_path: std::env::var("FLOWBOARD_STORAGE_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            dashboard: DashboardConfig::from_env(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file (path via FLOWBOARD_CONFIG or ./flowboard.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path = std::env::var("FLOWBOARD_CONFIG").unwrap_or_else(|_| "flowboard.toml".into());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::info!(target: "config", path = %path.display(), "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<AppConfigToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Join the API base and an endpoint with exactly one slash
    pub fn build_api_url(&self, endpoint: &str) -> String {
        let base = self.api.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        format!("{base}/{endpoint}")
    }

    /// Metrics proxy URL for a probe target, tagged with the owning node
    pub fn build_metrics_url(&self, target_url: &str, node: Option<&str>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("url", target_url);
        if let Some(node) = node {
            query.append_pair("node", node);
        }
        format!(
            "{}?{}",
            self.build_api_url(&self.api.metrics_endpoint),
            query.finish()
        )
    }

    pub fn diagram_url(&self, file: &str) -> String {
        self.build_resource_url(&self.api.diagrams_endpoint, file)
    }

    pub fn node_details_url(&self, node: &str) -> String {
        self.build_resource_url(&self.api.node_details_endpoint, node)
    }

    /// `{endpoint}/{name}` with `name` percent-encoded as one path segment
    fn build_resource_url(&self, endpoint: &str, name: &str) -> String {
        let base = self.build_api_url(endpoint);
        let Ok(mut url) = Url::parse(&base) else {
            return format!("{}/{}", base.trim_end_matches('/'), name);
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url.into()
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AppConfigToml {
    pub metric_interval_ms: Option<u64>,
    pub diagram: Option<String>,
    pub diagrams_dir: Option<PathBuf>,
    pub storage_path: Option<PathBuf>,
    pub api: Option<ApiToml>,
    pub development: Option<DevelopmentToml>,
    pub dashboard: Option<DashboardToml>,
}

impl AppConfigToml {
    fn overlay(self, mut base: AppConfig) -> AppConfig {
        if let Some(v) = self.metric_interval_ms {
            base.metric_interval_ms = v;
        }
        if let Some(v) = self.diagram {
            base.diagram = v;
        }
        if let Some(v) = self.diagrams_dir {
            base.diagrams_dir = Some(v);
        }
        if let Some(v) = self.storage_path {
            base.storage_path = Some(v);
        }
        if let Some(a) = self.api {
            a.apply(&mut base.api);
        }
        if let Some(d) = self.development {
            d.apply(&mut base.development);
        }
        if let Some(d) = self.dashboard {
            d.apply(&mut base.dashboard);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ApiToml {
    pub base_url: Option<String>,
    pub metrics_endpoint: Option<String>,
    pub diagrams_endpoint: Option<String>,
    pub node_details_endpoint: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

impl ApiToml {
    fn apply(self, api: &mut ApiConfig) {
        if let Some(v) = self.base_url {
            api.base_url = v;
        }
        if let Some(v) = self.metrics_endpoint {
            api.metrics_endpoint = v;
        }
        if let Some(v) = self.diagrams_endpoint {
            api.diagrams_endpoint = v;
        }
        if let Some(v) = self.node_details_endpoint {
            api.node_details_endpoint = v;
        }
        if let Some(v) = self.request_timeout_ms {
            api.request_timeout_ms = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct DevelopmentToml {
    pub enable_mock_data: Option<bool>,
    pub log_level: Option<String>,
}

impl DevelopmentToml {
    fn apply(self, dev: &mut DevelopmentConfig) {
        if let Some(v) = self.enable_mock_data {
            dev.enable_mock_data = v;
        }
        if let Some(v) = self.log_level {
            dev.log_level = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct DashboardToml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl DashboardToml {
    fn apply(self, dashboard: &mut DashboardConfig) {
        if let Some(v) = self.host {
            dashboard.host = v;
        }
        if let Some(v) = self.port {
            dashboard.port = v;
        }
    }
}
