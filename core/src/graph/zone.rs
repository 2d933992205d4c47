// Zone bounds calculator
//
// A node position is its top-left anchor, so the max edge is extended by the
// estimated card footprint before padding is applied.

use super::{ZoneData, ZoneNode};
use crate::diagram::{Position, Zone};
use crate::positions::PositionMap;
use serde::Serialize;
use tracing::debug;

pub const NODE_WIDTH_ESTIMATE: f64 = 220.0;
pub const NODE_HEIGHT_ESTIMATE: f64 = 200.0;

const DEFAULT_BORDER_COLOR: &str = "#00C48C";
const DEFAULT_BACKGROUND_COLOR: &str = "rgba(0, 196, 140, 0.05)";
const DEFAULT_LABEL_COLOR: &str = "#00C48C";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZonePadding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

pub const ZONE_PADDING: ZonePadding = ZonePadding {
    top: 60.0,
    right: 60.0,
    bottom: 120.0,
    left: 60.0,
};

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Rectangle enclosing every member present in `positions`; `None` when no member resolves
pub fn zone_bounds(members: &[String], positions: &PositionMap) -> Option<Rect> {
    let mut resolved = members.iter().filter_map(|m| positions.get(m));
    let first = resolved.next()?;

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in resolved {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let pad = ZONE_PADDING;
    Some(Rect {
        x: min_x - pad.left,
        y: min_y - pad.top,
        width: max_x - min_x + NODE_WIDTH_ESTIMATE + pad.left + pad.right,
        height: max_y - min_y + NODE_HEIGHT_ESTIMATE + pad.top + pad.bottom,
    })
}

/// Zone nodes for every zone with at least one placed member, in config order
pub fn build_zone_nodes(zones: &[Zone], positions: &PositionMap) -> Vec<ZoneNode> {
    zones
        .iter()
        .filter_map(|zone| {
            let Some(rect) = zone_bounds(&zone.nodes, positions) else {
                debug!(target: "compiler", zone = %zone.id, "Zone has no placed members; omitted");
                return None;
            };
            Some(ZoneNode {
                id: format!("zone-{}", zone.id),
                position: Position::new(rect.x, rect.y),
                draggable: false,
                selectable: false,
                connectable: false,
                z_index: -1,
                data: ZoneData {
                    label: zone.label.clone(),
                    width: rect.width,
                    height: rect.height,
                    border_color: zone
                        .border_color
                        .clone()
                        .unwrap_or_else(|| DEFAULT_BORDER_COLOR.to_string()),
                    background_color: zone
                        .background_color
                        .clone()
                        .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string()),
                    label_color: zone
                        .label_color
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
                    notch: zone.notch.clone(),
                },
            })
        })
        .collect()
}
