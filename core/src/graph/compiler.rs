// Graph compiler
//
// DiagramConfig + saved overrides -> positioned nodes and directional edges.
// Pure and synchronous: the same inputs always produce the same graph.

use super::zone::build_zone_nodes;
use super::{
    CompiledGraph, ContentData, ContentNode, EdgeData, EdgeStyle, PathOptions, RenderEdge,
    RenderNode,
};
use crate::diagram::{Connection, DiagramConfig, DiagramNode, EdgeType, LineType, Position};
use crate::positions::PositionMap;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_LINE_COLOR: &str = "#3498db";

const FALLBACK_SPACING_X: f64 = 300.0;
const FALLBACK_OFFSET_X: f64 = 100.0;
const FALLBACK_Y: f64 = 200.0;
const EDGE_STROKE_WIDTH: f64 = 2.0;
const EDGE_BORDER_RADIUS: f64 = 20.0;
const DASH_PATTERN: &str = "5,5";

/// Deterministic position for the node at `index` when nothing else places it
pub fn fallback_position(index: usize) -> Position {
    Position::new(index as f64 * FALLBACK_SPACING_X + FALLBACK_OFFSET_X, FALLBACK_Y)
}

pub struct GraphCompiler<'a> {
    config: &'a DiagramConfig,
    overrides: &'a PositionMap,
    show_coordinates: bool,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(config: &'a DiagramConfig, overrides: &'a PositionMap) -> Self {
        Self {
            config,
            overrides,
            show_coordinates: false,
        }
    }

    pub fn show_coordinates(mut self, show: bool) -> Self {
        self.show_coordinates = show;
        self
    }

    /// Saved override, then config position, then the fallback grid slot
    pub fn place(&self, index: usize, node: &DiagramNode) -> Position {
        self.overrides
            .get(&node.name)
            .copied()
            .or(node.position)
            .unwrap_or_else(|| fallback_position(index))
    }

    pub fn compile(&self) -> CompiledGraph {
        let content: Vec<ContentNode> = self
            .config
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| ContentNode {
                id: node.name.clone(),
                position: self.place(index, node),
                data: ContentData {
                    node: node.clone(),
                    config: self.config.config.clone(),
                    show_coordinates: self.show_coordinates,
                },
            })
            .collect();

        let positions: PositionMap = content
            .iter()
            .map(|c| (c.id.clone(), c.position))
            .collect();
        let zones = build_zone_nodes(self.config.zones(), &positions);

        let mut nodes: Vec<RenderNode> = zones.into_iter().map(RenderNode::Zone).collect();
        nodes.extend(content.into_iter().map(RenderNode::Content));

        let edges = resolve_edges(self.config);
        debug!(
            target: "compiler",
            nodes = nodes.len(),
            edges = edges.len(),
            "Compiled diagram"
        );

        CompiledGraph { nodes, edges }
    }
}

/// Compile a diagram in one call
pub fn compile(
    config: &DiagramConfig,
    overrides: &PositionMap,
    show_coordinates: bool,
) -> CompiledGraph {
    GraphCompiler::new(config, overrides)
        .show_coordinates(show_coordinates)
        .compile()
}

/// Edges for every `connectTo` entry whose target exists, in config order.
///
/// An entry naming `T` on node `N` means data flows `T -> N` unless the
/// effective particles say `direction: source`, which flips it to `N -> T`.
pub fn resolve_edges(config: &DiagramConfig) -> Vec<RenderEdge> {
    let known: HashMap<&str, &DiagramNode> =
        config.nodes.iter().map(|n| (n.name.as_str(), n)).collect();
    let mut edges = Vec::new();

    for node in &config.nodes {
        for (index, connection) in node.connect_to.iter().enumerate() {
            let target = connection.target();
            if !known.contains_key(target) {
                debug!(
                    target: "compiler",
                    node = %node.name,
                    connection = %target,
                    "Dropping connection to unknown node"
                );
                continue;
            }
            let edge = resolve_edge(node, connection, index);
            undeclared_handles(&edge, &known);
            edges.push(edge);
        }
    }

    edges
}

fn resolve_edge(node: &DiagramNode, connection: &Connection, index: usize) -> RenderEdge {
    let spec = connection.spec();
    let target = connection.target();

    let particles = spec
        .and_then(|s| s.particles.clone())
        .or_else(|| node.particles.clone());
    let particles_enabled = particles.as_ref().is_some_and(|p| p.enabled);

    let line_color = spec
        .and_then(|s| s.line_color.clone())
        .or_else(|| node.line_color.clone())
        .unwrap_or_else(|| DEFAULT_LINE_COLOR.to_string());
    let line_type = spec
        .and_then(|s| s.line_type)
        .or(node.line_type)
        .unwrap_or_default();
    let base_edge_type = spec
        .and_then(|s| s.edge_type)
        .or(node.edge_type)
        .unwrap_or_default();
    let edge_type = if particles_enabled {
        EdgeType::Particle
    } else {
        base_edge_type
    };

    let (source, sink) = if particles.as_ref().is_some_and(|p| p.flows_from_source()) {
        (node.name.as_str(), target)
    } else {
        (target, node.name.as_str())
    };

    let output_handle = spec.and_then(|s| s.output_handle).unwrap_or(0);
    let input_handle = spec.and_then(|s| s.input_handle).unwrap_or(0);

    RenderEdge {
        id: format!("{source}-{sink}-{index}"),
        source: source.to_string(),
        target: sink.to_string(),
        source_handle: format!("output-{output_handle}"),
        target_handle: format!("input-{input_handle}"),
        edge_type,
        animated: particles_enabled,
        style: EdgeStyle {
            stroke: line_color,
            stroke_width: EDGE_STROKE_WIDTH,
            stroke_dasharray: (line_type == LineType::Dashed).then(|| DASH_PATTERN.to_string()),
        },
        path_options: PathOptions {
            border_radius: EDGE_BORDER_RADIUS,
        },
        data: EdgeData {
            particles,
            original_edge_type: base_edge_type,
        },
    }
}

/// Handle labels of `edge` beyond the counts its endpoints declare.
///
/// The edge is still rendered; the surface simply has no anchor to attach it to.
fn undeclared_handles(edge: &RenderEdge, nodes: &HashMap<&str, &DiagramNode>) -> Vec<String> {
    let index = |label: &str| label.rsplit('-').next().and_then(|n| n.parse::<u32>().ok());
    let mut undeclared = Vec::new();

    let source = nodes.get(edge.source.as_str());
    if let (Some(owner), Some(handle)) = (source, index(&edge.source_handle)) {
        if handle >= owner.output_handles() {
            undeclared.push(edge.source_handle.clone());
        }
    }
    let target = nodes.get(edge.target.as_str());
    if let (Some(owner), Some(handle)) = (target, index(&edge.target_handle)) {
        if handle >= owner.input_handles() {
            undeclared.push(edge.target_handle.clone());
        }
    }

    if !undeclared.is_empty() {
        debug!(
            target: "compiler",
            edge = %edge.id,
            handles = ?undeclared,
            "Edge attaches to handles its nodes do not declare"
        );
    }
    undeclared
}
