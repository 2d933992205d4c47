//! Diagram configuration model
//!
//! Mirrors the JSON document served by `/api/diagrams/{file}`. Everything here is
//! plain data; positions, edges and zone rectangles are derived by the compiler.

use crate::{FlowboardError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Default node status poll interval when a probe omits `updateInterval`
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 30_000;

/// Top-level diagram document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagramConfig {
    pub config: GlobalConfig,
    pub nodes: Vec<DiagramNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<Zone>>,
}

/// Global display settings shared by every node of a diagram
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_glow: Option<NodeGlow>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            update_interval: default_update_interval(),
            title: String::new(),
            node_glow: None,
        }
    }
}

fn default_update_interval() -> u64 {
    DEFAULT_STATUS_INTERVAL_MS
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeGlow {
    pub enabled: bool,
    pub intensity: f64,
    pub spread: f64,
}

/// Top-left anchor of a node on the canvas
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickBehavior {
    #[default]
    Modal,
    Url,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Solid,
    Dashed,
}

/// Edge renderer requested by the config
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Default,
    #[default]
    Smoothstep,
    Straight,
    Step,
    Curved,
    /// Particle-flow renderer
    Particle,
}

/// Which endpoint emits particles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Source,
    #[default]
    Target,
}

/// Particle/animation metadata attached to a node or a single connection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<FlowDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

impl ParticleConfig {
    /// `true` when the flow runs from the owning node towards the connection target
    pub fn flows_from_source(&self) -> bool {
        self.direction == Some(FlowDirection::Source)
    }
}

/// Status probe: maps a field of a JSON response onto up/down
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusProbe {
    pub url: String,
    pub value_field: String,
    pub up_value: Value,
    pub down_value: Value,
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

/// Metric probe shown in a node's data grid
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGridItem {
    pub label: String,
    pub url: String,
    pub value_field: String,
}

/// Number of connection anchors on each side of a node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<u32>,
}

/// A `connectTo` entry, either a bare node name or a detailed spec
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Connection {
    Target(String),
    Detailed(ConnectionSpec),
}

impl Connection {
    pub fn target(&self) -> &str {
        match self {
            Connection::Target(name) => name,
            Connection::Detailed(spec) => &spec.target,
        }
    }

    pub fn spec(&self) -> Option<&ConnectionSpec> {
        match self {
            Connection::Target(_) => None,
            Connection::Detailed(spec) => Some(spec),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_handle: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_handle: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_type: Option<LineType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<EdgeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticleConfig>,
}

/// A single component of the pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramNode {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub click_behavior: ClickBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusProbe>,
    #[serde(default)]
    pub data_grid: Vec<DataGridItem>,
    #[serde(default)]
    pub connect_to: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_type: Option<LineType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<EdgeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handles: Option<Handles>,
}

impl DiagramNode {
    /// A bare node with no probes, connections or styling
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            icon: String::new(),
            position: None,
            circle_color: None,
            url: None,
            click_behavior: ClickBehavior::default(),
            status: None,
            data_grid: Vec::new(),
            connect_to: Vec::new(),
            line_type: None,
            line_color: None,
            edge_type: None,
            particles: None,
            handles: None,
        }
    }

    /// Input anchors; a missing count means one, zero is allowed
    pub fn input_handles(&self) -> u32 {
        self.handles.and_then(|h| h.input).unwrap_or(1)
    }

    pub fn output_handles(&self) -> u32 {
        self.handles.and_then(|h| h.output).unwrap_or(1)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotchCorner {
    #[default]
    TopRight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneNotch {
    #[serde(default)]
    pub corner: NotchCorner,
    pub width: f64,
    pub height: f64,
}

/// Background grouping of nodes; its rectangle is always derived
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notch: Option<ZoneNotch>,
}

impl DiagramConfig {
    /// Parse and shape-check a diagram document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DiagramConfig = serde_json::from_str(text)
            .map_err(|e| FlowboardError::Config(format!("invalid diagram document: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Node names must be non-empty and unique. Dangling connection targets and
    /// zone members are not errors; the compiler drops them.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if node.name.trim().is_empty() {
                return Err(FlowboardError::Config("node with empty name".to_string()));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(FlowboardError::Config(format!(
                    "duplicate node name: {}",
                    node.name
                )));
            }
        }
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn zones(&self) -> &[Zone] {
        self.zones.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_connection_forms() {
        let doc = json!({
            "config": { "layout": "horizontal", "updateInterval": 5000, "title": "t" },
            "nodes": [
                { "name": "A", "connectTo": ["B", { "target": "B", "outputHandle": 1,
                    "particles": { "enabled": true, "direction": "source" } }] },
                { "name": "B" }
            ]
        });
        let config = DiagramConfig::from_json(&doc.to_string()).unwrap();
        let a = config.node("A").unwrap();
        assert_eq!(a.connect_to[0], Connection::Target("B".into()));
        let spec = a.connect_to[1].spec().unwrap();
        assert_eq!(spec.output_handle, Some(1));
        assert!(spec.particles.as_ref().unwrap().flows_from_source());
        assert_eq!(a.input_handles(), 1);
    }

    #[test]
    fn rejects_duplicate_names() {
        let doc = json!({ "config": {}, "nodes": [{ "name": "A" }, { "name": "A" }] });
        let err = DiagramConfig::from_json(&doc.to_string()).unwrap_err();
        assert!(matches!(err, FlowboardError::Config(_)));
    }

    #[test]
    fn zero_handles_are_kept() {
        let doc = json!({ "config": {}, "nodes": [{ "name": "A", "handles": { "input": 0 } }] });
        let config = DiagramConfig::from_json(&doc.to_string()).unwrap();
        assert_eq!(config.nodes[0].input_handles(), 0);
        assert_eq!(config.nodes[0].output_handles(), 1);
    }
}
