// Renderable graph model
//
// Output of the compiler, consumed by the render surface. Zone nodes always
// precede content nodes so they stack underneath.

mod compiler;
mod zone;

pub use compiler::{compile, fallback_position, resolve_edges, GraphCompiler, DEFAULT_LINE_COLOR};
pub use zone::{
    build_zone_nodes, zone_bounds, Rect, ZonePadding, NODE_HEIGHT_ESTIMATE, NODE_WIDTH_ESTIMATE,
    ZONE_PADDING,
};

use crate::diagram::{DiagramNode, EdgeType, GlobalConfig, ParticleConfig, Position, ZoneNotch};
use crate::positions::PositionMap;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderNode {
    Zone(ZoneNode),
    #[serde(rename = "custom")]
    Content(ContentNode),
}

impl RenderNode {
    pub fn id(&self) -> &str {
        match self {
            RenderNode::Zone(z) => &z.id,
            RenderNode::Content(c) => &c.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            RenderNode::Zone(z) => z.position,
            RenderNode::Content(c) => c.position,
        }
    }
}

/// A pipeline component placed on the canvas
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContentNode {
    pub id: String,
    pub position: Position,
    pub data: ContentData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentData {
    #[serde(flatten)]
    pub node: DiagramNode,
    pub config: GlobalConfig,
    pub show_coordinates: bool,
}

/// Background rectangle derived from member positions
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneNode {
    pub id: String,
    pub position: Position,
    pub draggable: bool,
    pub selectable: bool,
    pub connectable: bool,
    pub z_index: i32,
    pub data: ZoneData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneData {
    pub label: String,
    pub width: f64,
    pub height: f64,
    pub border_color: String,
    pub background_color: String,
    pub label_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notch: Option<ZoneNotch>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub animated: bool,
    pub style: EdgeStyle,
    pub path_options: PathOptions,
    pub data: EdgeData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOptions {
    pub border_radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticleConfig>,
    /// Edge type before particle-flow forcing
    pub original_edge_type: EdgeType,
}

/// Positioned nodes plus resolved edges
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompiledGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl CompiledGraph {
    pub fn content_nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.iter().filter_map(|n| match n {
            RenderNode::Content(c) => Some(c),
            RenderNode::Zone(_) => None,
        })
    }

    pub fn zone_nodes(&self) -> impl Iterator<Item = &ZoneNode> {
        self.nodes.iter().filter_map(|n| match n {
            RenderNode::Zone(z) => Some(z),
            RenderNode::Content(_) => None,
        })
    }

    /// Current content node positions, the input of zone recomputation
    pub fn content_positions(&self) -> PositionMap {
        self.content_nodes()
            .map(|c| (c.id.clone(), c.position))
            .collect()
    }

    /// Move a content node; zone ids are ignored. Returns whether a node moved.
    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        for node in &mut self.nodes {
            if let RenderNode::Content(c) = node {
                if c.id == id {
                    c.position = position;
                    return true;
                }
            }
        }
        false
    }

    /// Swap in freshly computed zones, keeping them ahead of content nodes
    pub fn replace_zones(&mut self, zones: Vec<ZoneNode>) {
        let content: Vec<RenderNode> = self
            .nodes
            .drain(..)
            .filter(|n| matches!(n, RenderNode::Content(_)))
            .collect();
        self.nodes = zones.into_iter().map(RenderNode::Zone).collect();
        self.nodes.extend(content);
    }
}
