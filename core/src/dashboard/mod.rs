// Dashboard module - HTTP surface for the diagram view
//
// Serves the compiled graph, position updates, live overlay readings (SSE),
// display settings and node detail descriptors.

mod api;
mod event_stream;

pub use api::DashboardServer;
pub use event_stream::{dashboard_events, DashboardEvent};

/// Dashboard configuration
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardConfig {
    pub port: u16,
    pub host: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: 3030,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            port: std::env::var("FLOWBOARD_DASHBOARD_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.port),
            host: std::env::var("FLOWBOARD_DASHBOARD_HOST")
                .ok()
                .filter(|h| !h.is_empty())
                .unwrap_or(default.host),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
