//! Shared fakes for the async seams
#![allow(dead_code)]

use async_trait::async_trait;
use flowboard_core::diagram::{DataGridItem, DiagramConfig, DiagramNode, StatusProbe};
use flowboard_core::node_details::{NodeDetailConfig, NodeDetailsSource};
use flowboard_core::overlay::{ProbeError, ProbeFetcher};
use flowboard_core::{DiagramSource, FlowboardError, KeyValueStore, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// =============================================================================
// Probe fetcher
// =============================================================================

/// Answers probe requests from a url -> response table and counts calls
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, std::result::Result<Value, ProbeError>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: std::result::Result<Value, ProbeError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ProbeFetcher for FakeFetcher {
    async fn fetch(&self, target_url: &str, _node: &str) -> std::result::Result<Value, ProbeError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(target_url.to_string())
            .or_default() += 1;
        self.responses
            .lock()
            .unwrap()
            .get(target_url)
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::Network("connection refused".into())))
    }
}

/// Takes `latency` to answer every request and records the peak number of
/// requests in flight at once
pub struct SlowFetcher {
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowFetcher {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeFetcher for SlowFetcher {
    async fn fetch(&self, _url: &str, _node: &str) -> std::result::Result<Value, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({ "status": "UP" }))
    }
}

// =============================================================================
// Diagram source
// =============================================================================

/// Serves diagrams from memory; a file may be given an artificial delay
#[derive(Default)]
pub struct FakeSource {
    diagrams: Mutex<HashMap<String, DiagramConfig>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, file: &str, config: DiagramConfig) -> Self {
        self.diagrams
            .lock()
            .unwrap()
            .insert(file.to_string(), config);
        self
    }

    pub fn delayed(self, file: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(file.to_string(), delay);
        self
    }
}

#[async_trait]
impl DiagramSource for FakeSource {
    async fn fetch(&self, file: &str) -> Result<DiagramConfig> {
        let delay = self.delays.lock().unwrap().get(file).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let found = self.diagrams.lock().unwrap().get(file).cloned();
        found.ok_or_else(|| FlowboardError::ConfigNotFound(file.to_string()))
    }
}

// =============================================================================
// Node details source
// =============================================================================

/// Scripted detail responses; each call pops the next answer for the node
#[derive(Default)]
pub struct FakeDetails {
    answers: Mutex<HashMap<String, Vec<Result<Option<NodeDetailConfig>>>>>,
    calls: Mutex<HashMap<String, usize>>,
    pub delay: Option<Duration>,
}

impl FakeDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, node: &str, answer: Result<Option<NodeDetailConfig>>) {
        self.answers
            .lock()
            .unwrap()
            .entry(node.to_string())
            .or_default()
            .push(answer);
    }

    pub fn calls(&self, node: &str) -> usize {
        self.calls.lock().unwrap().get(node).copied().unwrap_or(0)
    }
}

#[async_trait]
impl NodeDetailsSource for FakeDetails {
    async fn fetch(&self, node: &str) -> Result<Option<NodeDetailConfig>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(node.to_string())
            .or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut answers = self.answers.lock().unwrap();
        match answers.get_mut(node) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Ok(None),
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Store that reads nothing and refuses every write
#[derive(Default)]
pub struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get_raw(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn put_raw(&self, key: &str, _value: Vec<u8>) -> Result<()> {
        Err(FlowboardError::StorageError(format!("disk full writing {key}")))
    }

    fn delete(&self, key: &str) -> Result<()> {
        Err(FlowboardError::StorageError(format!("disk full deleting {key}")))
    }
}

// =============================================================================
// Diagram builders
// =============================================================================

pub fn diagram(nodes: Vec<DiagramNode>) -> DiagramConfig {
    DiagramConfig {
        config: Default::default(),
        nodes,
        zones: None,
    }
}

pub fn status_probe(url: &str, interval_ms: u64) -> StatusProbe {
    StatusProbe {
        url: url.to_string(),
        value_field: "status".to_string(),
        up_value: json!("UP"),
        down_value: json!("DOWN"),
        update_interval: interval_ms,
    }
}

pub fn metric(label: &str, url: &str, field: &str) -> DataGridItem {
    DataGridItem {
        label: label.to_string(),
        url: url.to_string(),
        value_field: field.to_string(),
    }
}

/// Node with a status probe polled every 10s
pub fn probed_node(name: &str, url: &str) -> DiagramNode {
    let mut node = DiagramNode::named(name);
    node.status = Some(status_probe(url, 10_000));
    node
}
