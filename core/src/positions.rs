//! Per-diagram node position overrides
//!
//! Saved positions live in the key-value store under `diagram-positions-{file}`
//! as a single `{ nodeName: {x, y} }` object. Reads never fail; writes merge.

use crate::diagram::{DiagramConfig, Position};
use crate::storage::{KeyValueStore, KeyValueStoreExt};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub type PositionMap = HashMap<String, Position>;

const KEY_PREFIX: &str = "diagram-positions-";

#[derive(Clone)]
pub struct PositionStore {
    store: Arc<dyn KeyValueStore>,
}

impl PositionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key(diagram: &str) -> String {
        format!("{KEY_PREFIX}{diagram}")
    }

    /// Saved overrides for a diagram; empty when nothing was saved or the blob is unreadable
    pub fn load(&self, diagram: &str) -> PositionMap {
        match self.store.get_json::<PositionMap>(&Self::key(diagram)) {
            Ok(Some(map)) => map,
            Ok(None) => PositionMap::new(),
            Err(e) => {
                warn!(target: "positions", diagram = %diagram, error = %e, "Failed to read saved positions");
                PositionMap::new()
            }
        }
    }

    /// Merge `updates` into the stored map and persist the result.
    /// Nodes absent from `updates` keep their saved positions.
    pub fn merge(&self, diagram: &str, updates: &PositionMap) -> Result<PositionMap> {
        let mut current = self.load(diagram);
        if updates.is_empty() {
            return Ok(current);
        }
        current.extend(updates.iter().map(|(k, v)| (k.clone(), *v)));
        self.store.put_json(&Self::key(diagram), &current)?;
        debug!(target: "positions", diagram = %diagram, updated = updates.len(), "Saved positions");
        Ok(current)
    }

    /// Drop every saved position of a diagram
    pub fn clear(&self, diagram: &str) -> Result<()> {
        self.store.delete(&Self::key(diagram))
    }
}

/// Copy of `config` with node positions replaced by the rounded saved ones
pub fn export_layout(config: &DiagramConfig, overrides: &PositionMap) -> DiagramConfig {
    let mut exported = config.clone();
    for node in &mut exported.nodes {
        if let Some(pos) = overrides.get(&node.name) {
            node.position = Some(Position::new(pos.x.round(), pos.y.round()));
        }
    }
    exported
}
