//! Per-timestep topology construction
//!
//! Propagates every satellite to `t`, tests each unordered node pair once
//! against the visibility rules and publishes the resulting snapshot into the
//! history ring.

use crate::{HistoryBuffer, NodeId, Result, TopologySnapshot, VisibilityEngine};
use orbital_mechanics::{GroundStation, Position, Satellite, WalkerConstellation};
use petgraph::graph::NodeIndex;
use std::sync::Arc;
use tracing::debug;

pub struct TopologyBuilder {
    satellites: Vec<Satellite>,
    ground: GroundStation,
    visibility: VisibilityEngine,
    history: HistoryBuffer,
}

impl TopologyBuilder {
    pub fn new(
        constellation: &WalkerConstellation,
        ground: GroundStation,
        visibility: VisibilityEngine,
        history_capacity: usize,
    ) -> Result<Self> {
        Ok(Self {
            satellites: constellation.satellites(),
            ground,
            visibility,
            history: HistoryBuffer::new(history_capacity)?,
        })
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Every node id, satellites by plane then slot, ground station last
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.satellites
            .iter()
            .map(|s| NodeId::Satellite(s.id))
            .chain(std::iter::once(NodeId::Ground))
            .collect()
    }

    fn positions_at(&self, t: f64) -> Vec<(NodeId, Position)> {
        self.satellites
            .iter()
            .map(|s| (NodeId::Satellite(s.id), s.position(t)))
            .chain(std::iter::once((NodeId::Ground, self.ground.position())))
            .collect()
    }

    /// Builds the snapshot at `t` without touching the history
    pub fn build_snapshot(&self, t: f64) -> TopologySnapshot {
        let nodes = self.positions_at(t);
        let mut snapshot = TopologySnapshot::with_nodes(t, nodes.iter().copied());

        for i in 0..nodes.len() {
            let (id_a, pos_a) = &nodes[i];
            for (j, (id_b, pos_b)) in nodes.iter().enumerate().skip(i + 1) {
                if let Some(link) = self.visibility.check_pair((*id_a, pos_a), (*id_b, pos_b)) {
                    snapshot.insert_link(NodeIndex::new(i), NodeIndex::new(j), link);
                }
            }
        }

        snapshot
    }

    /// Builds the snapshot at `t`, records it in the history and returns it
    pub fn advance(&mut self, t: f64) -> Arc<TopologySnapshot> {
        let snapshot = Arc::new(self.build_snapshot(t));
        let stats = snapshot.stats();
        debug!(
            "Topology at t={}: {} nodes, {} ISLs, {} ground links",
            t, stats.total_nodes, stats.isl_links, stats.ground_links
        );

        self.history.push(Arc::clone(&snapshot));
        snapshot
    }
}
