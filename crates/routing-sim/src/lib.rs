//! Constellation Routing Simulator
//!
//! Discrete-time store-and-forward simulation over a Walker constellation and
//! one ground station. Each timestep:
//!
//! 1. Rebuild the topology snapshot and push it into the history ring
//! 2. Emit scheduled packets from the ground station
//! 3. Ask the [`Router`] for one hop per in-flight packet
//! 4. Hand delivered and dropped packets to the metrics collector
//!
//! Routing strategies plug in through the [`Router`] trait. The shortest-path
//! [`BaselineRouter`] is the reference, [`AdaptiveRouter`] weighs link
//! persistence over recent history.

use orbital_topology::TopologyError;
use thiserror::Error;

pub mod adaptive;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod packet;
pub mod router;
pub mod runner;
pub mod traffic;

pub use adaptive::{AdaptiveConfig, AdaptiveRouter};
pub use config::{ConfigError, SimulationConfig};
pub use engine::{SimulationEngine, StepSummary};
pub use metrics::{MetricsCollector, MetricsReport};
pub use packet::{DropReason, Packet, PacketId, PacketState};
pub use router::{BaselineRouter, Router, RouterKind, RoutingError};
pub use runner::{run_matrix, scaling_sweep, RunArtifact};
pub use traffic::TrafficGenerator;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

pub type Result<T> = std::result::Result<T, SimError>;
