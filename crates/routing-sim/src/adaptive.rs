//! Persistence-weighted routing
//!
//! Prefers links that have been present across the recent history. A link
//! seen in every retained snapshot costs its distance; a link that just
//! appeared costs up to `1 + instability_penalty` times its distance.
//!
//! ```text
//! cost(e) = distance(e) * (1 + penalty * (1 - persistence(e)))
//! persistence(e) = snapshots containing e / snapshots retained
//! ```
//!
//! Whenever this strategy has nothing to offer it defers to the shortest path
//! router, so it never reports a failure of its own.

use crate::packet::Packet;
use crate::router::{BaselineRouter, Router, RoutingError};
use orbital_topology::{HistoryBuffer, NodeId, TopologySnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Extra cost factor for a link absent from all history
    pub instability_penalty: f64,
    /// Below this remaining TTL (s) take the plain shortest path
    pub min_ttl_margin_s: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            instability_penalty: 1.0,
            min_ttl_margin_s: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdaptiveRouter {
    config: AdaptiveConfig,
    fallback: BaselineRouter,
}

impl AdaptiveRouter {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            fallback: BaselineRouter::new(),
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    fn weighted_hop(
        &self,
        snapshot: &TopologySnapshot,
        history: &HistoryBuffer,
        from: NodeId,
        to: NodeId,
    ) -> Option<NodeId> {
        let retained = history.len() as f64;
        let penalty = self.config.instability_penalty;

        let path = snapshot.find_path_by(from, to, |a, b, link| {
            let seen = history.iter().filter(|past| past.has_edge(a, b)).count() as f64;
            let persistence = seen / retained;
            link.distance_km * (1.0 + penalty * (1.0 - persistence))
        })?;

        path.get(1).copied()
    }
}

impl Router for AdaptiveRouter {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn next_hop(
        &self,
        packet: &Packet,
        snapshot: &TopologySnapshot,
        time_s: f64,
        history: &HistoryBuffer,
    ) -> Result<Option<NodeId>, RoutingError> {
        let current = packet.current_node();
        let dst = packet.dst();
        if current == dst {
            return Ok(None);
        }

        let fallback = || self.fallback.next_hop(packet, snapshot, time_s, history);

        if history.is_empty() || packet.ttl_remaining_s() <= self.config.min_ttl_margin_s {
            return fallback();
        }

        match self.weighted_hop(snapshot, history, current, dst) {
            Some(hop) if snapshot.has_edge(current, hop) => Ok(Some(hop)),
            _ => {
                debug!("{}: no persistent route from {}, using shortest path", packet.id(), current);
                fallback()
            }
        }
    }
}
