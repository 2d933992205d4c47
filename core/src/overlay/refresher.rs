// Live overlay refresher
//
// One task per status probe and per data-grid metric. Each task owns its
// interval and its trigger, so ticks of one probe never overlap while ticks of
// different probes interleave freely. Readings go to a snapshot map and a
// broadcast channel; nothing here touches the compiled graph.

use super::probe::{evaluate_metric, evaluate_status, ProbeFetcher, StatusState};
use crate::diagram::{DataGridItem, DiagramNode, StatusProbe};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Shortest poll period accepted from a config
const MIN_INTERVAL_MS: u64 = 1_000;

#[derive(Clone, Debug)]
pub struct OverlaySettings {
    pub metric_interval: Duration,
    /// Development-only: failed probes read as healthy
    pub mock_mode: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            metric_interval: Duration::from_secs(30),
            mock_mode: false,
        }
    }
}

/// Which probe of a node a reading belongs to
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeSlot {
    Status,
    Metric { index: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProbeKey {
    pub node: String,
    pub slot: ProbeSlot,
}

impl ProbeKey {
    pub fn status(node: &str) -> Self {
        Self {
            node: node.to_string(),
            slot: ProbeSlot::Status,
        }
    }

    pub fn metric(node: &str, index: usize) -> Self {
        Self {
            node: node.to_string(),
            slot: ProbeSlot::Metric { index },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ReadingValue {
    Status(StatusState),
    Metric(String),
}

/// Latest result of one probe tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReading {
    pub key: ProbeKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub value: ReadingValue,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// Probe configuration; a change of identity restarts the probe
#[derive(Clone, Debug, PartialEq)]
enum ProbeSpec {
    Status(StatusProbe),
    Metric(DataGridItem),
}

struct ProbeHandle {
    id: u64,
    spec: ProbeSpec,
    trigger: Arc<Notify>,
    task: JoinHandle<()>,
}

type HandleMap = DashMap<ProbeKey, ProbeHandle>;
type ReadingMap = DashMap<ProbeKey, ProbeReading>;

pub struct OverlayRefresher {
    fetcher: Arc<dyn ProbeFetcher>,
    settings: OverlaySettings,
    probes: Arc<HandleMap>,
    readings: Arc<ReadingMap>,
    updates: broadcast::Sender<ProbeReading>,
    next_id: AtomicU64,
}

impl OverlayRefresher {
    pub fn new(fetcher: Arc<dyn ProbeFetcher>, settings: OverlaySettings) -> Self {
        if settings.mock_mode {
            info!(target: "overlay", "Mock probe data enabled");
        }
        let (updates, _) = broadcast::channel(1000);
        Self {
            fetcher,
            settings,
            probes: Arc::new(DashMap::new()),
            readings: Arc::new(DashMap::new()),
            updates,
            next_id: AtomicU64::new(1),
        }
    }

    /// Start (or keep) the probes of a node; probes whose config changed restart
    pub fn mount_node(&self, node: &DiagramNode) {
        let desired = Self::desired_probes(node);
        let wanted: HashSet<ProbeKey> = desired.iter().map(|(k, _)| k.clone()).collect();

        let stale: Vec<ProbeKey> = self
            .probes
            .iter()
            .filter(|e| e.key().node == node.name && !wanted.contains(e.key()))
            .map(|e| e.key().clone())
            .collect();
        for key in stale {
            self.stop(&key);
            self.readings.remove(&key);
        }

        for (key, spec) in desired {
            let unchanged = self.probes.get(&key).is_some_and(|h| h.spec == spec);
            if unchanged {
                continue;
            }
            self.stop(&key);
            self.start(key, spec);
        }
    }

    /// Cancel every probe of a node and forget its readings
    pub fn unmount_node(&self, name: &str) {
        let keys: Vec<ProbeKey> = self
            .probes
            .iter()
            .filter(|e| e.key().node == name)
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            self.stop(&key);
        }
        self.readings.retain(|k, _| k.node != name);
    }

    /// Make the running probe set match `nodes`
    pub fn sync_nodes(&self, nodes: &[DiagramNode]) {
        let names: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        let gone: HashSet<String> = self
            .probes
            .iter()
            .map(|e| e.key().node.clone())
            .chain(self.readings.iter().map(|e| e.key().node.clone()))
            .filter(|n| !names.contains(n.as_str()))
            .collect();
        for name in gone {
            self.unmount_node(&name);
        }
        for node in nodes {
            self.mount_node(node);
        }
    }

    pub fn unmount_all(&self) {
        let keys: Vec<ProbeKey> = self.probes.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.stop(&key);
        }
        self.readings.clear();
    }

    /// Run an out-of-band tick for every probe of a node; returns how many were triggered
    pub fn refresh_node(&self, name: &str) -> usize {
        let mut triggered = 0;
        for entry in self.probes.iter().filter(|e| e.key().node == name) {
            entry.value().trigger.notify_one();
            triggered += 1;
        }
        triggered
    }

    pub fn refresh_all(&self) -> usize {
        for entry in self.probes.iter() {
            entry.value().trigger.notify_one();
        }
        self.probes.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProbeReading> {
        self.updates.subscribe()
    }

    pub fn reading(&self, key: &ProbeKey) -> Option<ProbeReading> {
        self.readings.get(key).map(|r| r.clone())
    }

    /// All current readings ordered by node then slot
    pub fn snapshot(&self) -> Vec<ProbeReading> {
        let mut all: Vec<ProbeReading> = self.readings.iter().map(|r| r.clone()).collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    pub fn active_probes(&self) -> usize {
        self.probes.len()
    }

    pub fn is_running(&self, key: &ProbeKey) -> bool {
        self.probes.contains_key(key)
    }

    fn desired_probes(node: &DiagramNode) -> Vec<(ProbeKey, ProbeSpec)> {
        let mut desired = Vec::with_capacity(node.data_grid.len() + 1);
        if let Some(status) = &node.status {
            desired.push((ProbeKey::status(&node.name), ProbeSpec::Status(status.clone())));
        }
        for (index, item) in node.data_grid.iter().enumerate() {
            desired.push((
                ProbeKey::metric(&node.name, index),
                ProbeSpec::Metric(item.clone()),
            ));
        }
        desired
    }

    fn stop(&self, key: &ProbeKey) {
        if let Some((_, handle)) = self.probes.remove(key) {
            handle.task.abort();
            debug!(target: "overlay", node = %key.node, slot = ?key.slot, "Probe stopped");
        }
    }

    fn start(&self, key: ProbeKey, spec: ProbeSpec) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let trigger = Arc::new(Notify::new());
        let period = match &spec {
            ProbeSpec::Status(status) => Duration::from_millis(status.update_interval),
            ProbeSpec::Metric(_) => self.settings.metric_interval,
        }
        .max(Duration::from_millis(MIN_INTERVAL_MS));

        let task = ProbeTask {
            id,
            key: key.clone(),
            spec: spec.clone(),
            period,
            mock_mode: self.settings.mock_mode,
            fetcher: self.fetcher.clone(),
            trigger: trigger.clone(),
            probes: self.probes.clone(),
            readings: self.readings.clone(),
            updates: self.updates.clone(),
        };
        debug!(target: "overlay", node = %key.node, slot = ?key.slot, period_ms = period.as_millis() as u64, "Probe started");

        // Spawn under the entry guard so the first tick cannot publish before
        // the handle it checks ownership against exists.
        match self.probes.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.get().task.abort();
                slot.insert(ProbeHandle {
                    id,
                    spec,
                    trigger,
                    task: tokio::spawn(task.run()),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(ProbeHandle {
                    id,
                    spec,
                    trigger,
                    task: tokio::spawn(task.run()),
                });
            }
        }
    }
}

impl Drop for OverlayRefresher {
    fn drop(&mut self) {
        for entry in self.probes.iter() {
            entry.value().task.abort();
        }
    }
}

struct ProbeTask {
    id: u64,
    key: ProbeKey,
    spec: ProbeSpec,
    period: Duration,
    mock_mode: bool,
    fetcher: Arc<dyn ProbeFetcher>,
    trigger: Arc<Notify>,
    probes: Arc<HandleMap>,
    readings: Arc<ReadingMap>,
    updates: broadcast::Sender<ProbeReading>,
}

impl ProbeTask {
    async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.trigger.notified() => {}
            }
            let reading = self.tick().await;
            self.publish(reading);
        }
    }

    async fn tick(&self) -> ProbeReading {
        match &self.spec {
            ProbeSpec::Status(probe) => {
                let fetched = self.fetcher.fetch(&probe.url, &self.key.node).await;
                let outcome = evaluate_status(probe, fetched, self.mock_mode);
                ProbeReading {
                    key: self.key.clone(),
                    label: None,
                    value: ReadingValue::Status(outcome.state),
                    checked_at: Utc::now(),
                    annotation: outcome.annotation,
                }
            }
            ProbeSpec::Metric(item) => {
                let fetched = self.fetcher.fetch(&item.url, &self.key.node).await;
                let outcome = evaluate_metric(item, fetched, self.mock_mode);
                ProbeReading {
                    key: self.key.clone(),
                    label: Some(item.label.clone()),
                    value: ReadingValue::Metric(outcome.display),
                    checked_at: Utc::now(),
                    annotation: outcome.annotation,
                }
            }
        }
    }

    /// Store the reading only while this task still owns its slot. Holding the
    /// handle guard keeps a concurrent unmount from interleaving.
    fn publish(&self, reading: ProbeReading) {
        let Some(handle) = self.probes.get(&self.key) else {
            return;
        };
        if handle.id != self.id {
            return;
        }
        if let Some(note) = &reading.annotation {
            debug!(target: "overlay", node = %self.key.node, slot = ?self.key.slot, annotation = %note, "Probe degraded");
        }
        self.readings.insert(self.key.clone(), reading.clone());
        let _ = self.updates.send(reading);
        drop(handle);
    }
}
