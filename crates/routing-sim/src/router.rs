//! Routing strategies
//!
//! A router answers one question per packet per timestep: which neighbour of
//! the packet's current node should it move to next. It sees the current
//! snapshot and the recent history, never mutates either, and must give the
//! same answer for the same inputs.

use crate::adaptive::AdaptiveRouter;
use crate::config::SimulationConfig;
use crate::packet::Packet;
use orbital_topology::{HistoryBuffer, NodeId, TopologySnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A router that could not produce a decision.
///
/// The engine drops the packet with `router_error`; the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Routing failed: {0}")]
    Failed(String),
}

/// Next-hop decision interface
pub trait Router: Send + Sync {
    fn name(&self) -> &str;

    /// Next hop for `packet`, or `None` when no route exists.
    ///
    /// A returned node must be a neighbour of `packet.current_node()` in
    /// `snapshot`; anything else is treated as no route.
    fn next_hop(
        &self,
        packet: &Packet,
        snapshot: &TopologySnapshot,
        time_s: f64,
        history: &HistoryBuffer,
    ) -> Result<Option<NodeId>, RoutingError>;
}

/// Shortest path by link distance on the current snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineRouter;

impl BaselineRouter {
    pub fn new() -> Self {
        Self
    }

    /// First hop of the shortest path from `from` to `to`
    pub fn first_hop(&self, snapshot: &TopologySnapshot, from: NodeId, to: NodeId) -> Option<NodeId> {
        if from == to {
            return None;
        }
        snapshot
            .find_path(from, to)
            .and_then(|path| path.get(1).copied())
    }
}

impl Router for BaselineRouter {
    fn name(&self) -> &str {
        "baseline"
    }

    fn next_hop(
        &self,
        packet: &Packet,
        snapshot: &TopologySnapshot,
        _time_s: f64,
        _history: &HistoryBuffer,
    ) -> Result<Option<NodeId>, RoutingError> {
        Ok(self.first_hop(snapshot, packet.current_node(), packet.dst()))
    }
}

/// In-tree router selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterKind {
    Baseline,
    Adaptive,
}

impl RouterKind {
    pub const ALL: [RouterKind; 2] = [RouterKind::Baseline, RouterKind::Adaptive];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouterKind::Baseline => "baseline",
            RouterKind::Adaptive => "adaptive",
        }
    }

    pub fn build(&self, config: &SimulationConfig) -> Box<dyn Router> {
        match self {
            RouterKind::Baseline => Box::new(BaselineRouter::new()),
            RouterKind::Adaptive => Box::new(AdaptiveRouter::new(config.adaptive)),
        }
    }
}

impl fmt::Display for RouterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(RouterKind::Baseline),
            "adaptive" => Ok(RouterKind::Adaptive),
            other => Err(format!("unknown router: {}", other)),
        }
    }
}
