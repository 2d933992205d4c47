//! AppConfig tests: env defaults, TOML overlay and URL builders
//!
//! These mutate process environment, so each holds `ENV_LOCK`.

use flowboard_core::{AppConfig, DashboardConfig};
use std::fs;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

const VARS: &[&str] = &[
    "FLOWBOARD_API_URL",
    "FLOWBOARD_ENABLE_MOCK_DATA",
    "FLOWBOARD_LOG_LEVEL",
    "FLOWBOARD_METRIC_INTERVAL_MS",
    "FLOWBOARD_REQUEST_TIMEOUT_MS",
    "FLOWBOARD_DIAGRAM",
    "FLOWBOARD_STORAGE_PATH",
    "FLOWBOARD_DASHBOARD_HOST",
    "FLOWBOARD_DASHBOARD_PORT",
];

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize env access and start from a clean slate
fn lock_env() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    guard
}

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn defaults_without_env() {
    let _env = lock_env();
    let cfg = AppConfig::default();

    assert_eq!(cfg.api.base_url, "http://localhost:8080/api");
    assert!(!cfg.development.enable_mock_data);
    assert_eq!(cfg.metric_interval_ms, 30_000);
    assert_eq!(cfg.diagram, "diagram-config.json");
    assert!(cfg.storage_path.is_none());
    assert_eq!(cfg.dashboard, DashboardConfig::default());
}

#[test]
fn env_overrides_defaults() {
    let _env = lock_env();
    std::env::set_var("FLOWBOARD_API_URL", "https://ops.example.com/api/");
    std::env::set_var("FLOWBOARD_ENABLE_MOCK_DATA", "true");
    std::env::set_var("FLOWBOARD_DASHBOARD_PORT", "4040");
    std::env::set_var("FLOWBOARD_METRIC_INTERVAL_MS", "not-a-number");

    let cfg = AppConfig::default();
    clear_env();

    assert_eq!(cfg.api.base_url, "https://ops.example.com/api/");
    assert!(cfg.development.enable_mock_data);
    assert_eq!(cfg.dashboard.port, 4040);
    assert_eq!(cfg.dashboard.host, "127.0.0.1");
    assert_eq!(cfg.metric_interval_ms, 30_000);
}

#[test]
fn mock_flag_needs_exact_true() {
    let _env = lock_env();
    std::env::set_var("FLOWBOARD_ENABLE_MOCK_DATA", "1");
    let cfg = AppConfig::default();
    clear_env();
    assert!(!cfg.development.enable_mock_data);
}

#[test]
fn toml_overlays_env_defaults() {
    let _env = lock_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flowboard.toml");
    fs::write(
        &path,
        r#"
metric_interval_ms = 5000
diagram = "ops.json"

[api]
base_url = "http://gateway:9000/api"
request_timeout_ms = 2500

[development]
enable_mock_data = true

[dashboard]
port = 8081
"#,
    )
    .unwrap();

    let cfg = AppConfig::load_from(&path);
    assert_eq!(cfg.metric_interval_ms, 5000);
    assert_eq!(cfg.diagram, "ops.json");
    assert_eq!(cfg.api.base_url, "http://gateway:9000/api");
    assert_eq!(cfg.api.request_timeout_ms, 2500);
    assert_eq!(cfg.api.metrics_endpoint, "/metrics");
    assert!(cfg.development.enable_mock_data);
    assert_eq!(cfg.dashboard.port, 8081);
    assert_eq!(cfg.dashboard.host, "127.0.0.1");
}

#[test]
fn missing_or_broken_toml_keeps_defaults() {
    let _env = lock_env();
    let dir = TempDir::new().unwrap();
    assert_eq!(
        AppConfig::load_from(&dir.path().join("absent.toml")).diagram,
        "diagram-config.json"
    );

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "metric_interval_ms = \"soon\"").unwrap();
    assert_eq!(AppConfig::load_from(&broken).metric_interval_ms, 30_000);
}

#[test]
fn url_builders() {
    let _env = lock_env();
    let mut cfg = AppConfig::default();
    cfg.api.base_url = "http://localhost:8080/api/".into();

    assert_eq!(cfg.build_api_url("/metrics"), "http://localhost:8080/api/metrics");
    assert_eq!(cfg.build_api_url("metrics"), "http://localhost:8080/api/metrics");
    assert_eq!(
        cfg.build_metrics_url("http://svc:8080/health?full=1", Some("order api")),
        "http://localhost:8080/api/metrics?url=http%3A%2F%2Fsvc%3A8080%2Fhealth%3Ffull%3D1&node=order+api"
    );
    assert_eq!(
        cfg.build_metrics_url("http://svc/x", None),
        "http://localhost:8080/api/metrics?url=http%3A%2F%2Fsvc%2Fx"
    );
    assert_eq!(
        cfg.diagram_url("ops.json"),
        "http://localhost:8080/api/diagrams/ops.json"
    );
    assert_eq!(
        cfg.node_details_url("kafka broker"),
        "http://localhost:8080/api/node-details/kafka%20broker"
    );
}
