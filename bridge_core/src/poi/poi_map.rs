//! Mapping from canonical POIs to the node numbering of a line-girder model.
//!
//! The solver may split one physical location into two nodes, for example
//! at a closure joint that has not been cast yet. Such a POI maps to a
//! left/right pair; everything else maps to a single node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PoiId;

/// Solver node(s) representing one POI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverNodes {
    Single(usize),
    Pair { left: usize, right: usize },
}

impl SolverNodes {
    pub fn left(&self) -> usize {
        match *self {
            SolverNodes::Single(n) => n,
            SolverNodes::Pair { left, .. } => left,
        }
    }

    pub fn right(&self) -> usize {
        match *self {
            SolverNodes::Single(n) => n,
            SolverNodes::Pair { right, .. } => right,
        }
    }
}

/// Canonical POI to solver node adapter. Rebuilt with every structural model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiMap {
    nodes: BTreeMap<PoiId, SolverNodes>,
}

impl PoiMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn insert(&mut self, poi: PoiId, nodes: SolverNodes) {
        self.nodes.insert(poi, nodes);
    }

    pub fn get(&self, poi: PoiId) -> Option<SolverNodes> {
        self.nodes.get(&poi).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoiId, SolverNodes)> + '_ {
        self.nodes.iter().map(|(id, n)| (*id, *n))
    }

    /// Canonical POIs represented by solver node `node`
    pub fn pois_at_node(&self, node: usize) -> Vec<PoiId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.left() == node || n.right() == node)
            .map(|(id, _)| *id)
            .collect()
    }
}
