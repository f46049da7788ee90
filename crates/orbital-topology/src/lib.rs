//! Orbital Topology
//!
//! Graph layer for the constellation network:
//!
//! - Node identities (satellites + the ground station)
//! - Line-of-sight visibility rules per scenario
//! - Immutable per-timestep topology snapshots
//! - Bounded history of recent snapshots
//!
//! A snapshot is a pure function of the constellation, the scenario and the
//! timestamp. Links are never carried from one snapshot to the next.

use orbital_mechanics::SatelliteId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod builder;
pub mod history;
pub mod snapshot;
pub mod visibility;

pub use builder::TopologyBuilder;
pub use history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
pub use snapshot::{Link, LinkKind, SnapshotStats, TopologySnapshot};
pub use visibility::{Scenario, VisibilityEngine, VisibilityParams};

/// Topology errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Self-loop on node {0}")]
    SelfLoop(NodeId),
    #[error("Duplicate link between {0} and {1}")]
    DuplicateLink(NodeId, NodeId),
    #[error("History capacity must be at least 1")]
    ZeroHistoryCapacity,
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

pub type Result<T> = std::result::Result<T, TopologyError>;

/// A node of the constellation graph.
///
/// Ordered satellites first (by plane, then slot), ground station last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeId {
    Satellite(SatelliteId),
    Ground,
}

impl NodeId {
    pub fn satellite(plane: u32, slot: u32) -> Self {
        NodeId::Satellite(SatelliteId::new(plane, slot))
    }

    pub fn is_satellite(&self) -> bool {
        matches!(self, NodeId::Satellite(_))
    }

    pub fn is_ground_station(&self) -> bool {
        matches!(self, NodeId::Ground)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Satellite(id) => write!(f, "{}", id),
            NodeId::Ground => f.write_str("ground"),
        }
    }
}

impl FromStr for NodeId {
    type Err = TopologyError;

    /// Parses `ground` or `sat_{plane}_{slot}`
    fn from_str(s: &str) -> Result<Self> {
        if s == "ground" {
            return Ok(NodeId::Ground);
        }

        let invalid = || TopologyError::InvalidNodeId(s.to_string());
        let rest = s.strip_prefix("sat_").ok_or_else(invalid)?;
        let (plane, slot) = rest.split_once('_').ok_or_else(invalid)?;
        let plane = plane.parse().map_err(|_| invalid())?;
        let slot = slot.parse().map_err(|_| invalid())?;

        Ok(NodeId::satellite(plane, slot))
    }
}

impl TryFrom<String> for NodeId {
    type Error = TopologyError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}
