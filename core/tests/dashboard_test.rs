//! Dashboard HTTP surface tests
//!
//! Binds the real router to an ephemeral port and talks to it with reqwest.

mod common;

use common::{diagram, probed_node, FakeDetails, FakeFetcher, FakeSource};
use flowboard_core::diagram::{Connection, Position};
use flowboard_core::node_details::NodeDetailConfig;
use flowboard_core::overlay::{OverlayRefresher, OverlaySettings};
use flowboard_core::{
    DashboardConfig, DashboardServer, DiagramSession, InMemoryStore, KeyValueStore,
    NodeDetailsCache, ParticleSettings, PositionStore,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

struct TestServer {
    base: String,
    client: reqwest::Client,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn start() -> TestServer {
    let mut sink = probed_node("sink", "http://sink/health");
    sink.connect_to = vec![Connection::Target("source".into())];
    let source = probed_node("source", "http://source/health");

    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let overlay = Arc::new(OverlayRefresher::new(
        Arc::new(FakeFetcher::new()),
        OverlaySettings::default(),
    ));
    let session = Arc::new(DiagramSession::new(
        Arc::new(FakeSource::new().with("ops.json", diagram(vec![source, sink]))),
        PositionStore::new(store.clone()),
        overlay,
    ));
    let details = Arc::new(FakeDetails::new());
    details.answer(
        "sink",
        Ok(Some(NodeDetailConfig {
            title: Some("Sink".into()),
            ..Default::default()
        })),
    );

    let server = DashboardServer::new(
        DashboardConfig::default(),
        session,
        Arc::new(ParticleSettings::load(store)),
        NodeDetailsCache::new(details),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let task = tokio::spawn(async move {
        server.serve_on(listener).await.unwrap();
    });

    TestServer {
        base,
        client: reqwest::Client::new(),
        task,
    }
}

#[tokio::test]
async fn graph_is_unavailable_until_a_diagram_loads() {
    let server = start().await;

    let res = server.client.get(server.url("/api/graph")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = server
        .client
        .post(server.url("/api/graph/select"))
        .json(&json!({ "file": "ops.json" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let graph: Value = server
        .client
        .get(server.url("/api/graph"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(graph["edges"][0]["source"], "source");
}

#[tokio::test]
async fn failed_selection_reports_config_error() {
    let server = start().await;

    let res = server
        .client
        .post(server.url("/api/graph/select"))
        .json(&json!({ "file": "missing.json" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = server.client.get(server.url("/api/graph")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["diagram"], "missing.json");
}

#[tokio::test]
async fn positions_round_trip_through_layout_export() {
    let server = start().await;
    server
        .client
        .post(server.url("/api/graph/select"))
        .json(&json!({ "file": "ops.json" }))
        .send()
        .await
        .unwrap();

    let res = server
        .client
        .post(server.url("/api/graph/positions"))
        .json(&json!([{ "id": "sink", "position": { "x": 640.4, "y": 80.6 }, "dragging": false }]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let layout: Value = server
        .client
        .get(server.url("/api/graph/layout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sink = layout["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["name"] == "sink")
        .unwrap();
    let position: Position = serde_json::from_value(sink["position"].clone()).unwrap();
    assert_eq!(position, Position::new(640.0, 81.0));
}

#[tokio::test]
async fn particle_settings_are_clamped() {
    let server = start().await;

    let current: Value = server
        .client
        .get(server.url("/api/settings/particles"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["maxParticles"], 4);

    let updated: Value = server
        .client
        .put(server.url("/api/settings/particles"))
        .json(&json!({ "maxParticles": 64 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["maxParticles"], 20);
}

#[tokio::test]
async fn node_details_404_when_absent() {
    let server = start().await;

    let res = server.client.get(server.url("/api/details/sink")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["title"], "Sink");

    let res = server.client.get(server.url("/api/details/source")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_reports_triggered_probes() {
    let server = start().await;
    server
        .client
        .post(server.url("/api/graph/select"))
        .json(&json!({ "file": "ops.json" }))
        .send()
        .await
        .unwrap();

    let all: Value = server
        .client
        .post(server.url("/api/overlay/refresh"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all["triggered"], 2);

    let one: Value = server
        .client
        .post(server.url("/api/overlay/refresh?node=sink"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["triggered"], 1);
}
