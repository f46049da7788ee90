//! Simulation configuration
//!
//! Every field has a default, so `{}` is a valid configuration file: a 4x4
//! constellation at 550 km, a ground station at (0°, 0°), the stable
//! scenario, 600 one-second steps.

use crate::adaptive::AdaptiveConfig;
use crate::traffic::default_destination;
use crate::Result;
use orbital_mechanics::{GroundStation, WalkerConstellation};
use orbital_topology::{NodeId, Scenario, DEFAULT_HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0}")]
    Constellation(String),
    #[error("{0}")]
    GroundStation(String),
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("duration_s ({duration_s}) is shorter than one timestep ({timestep_s})")]
    DurationBelowTimestep { duration_s: f64, timestep_s: f64 },
    #[error("history_capacity must be at least 1")]
    ZeroHistoryCapacity,
    #[error("destination {0} is not a satellite of the constellation")]
    UnknownDestination(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstellationConfig {
    pub number_of_planes: u32,
    pub sats_per_plane: u32,
    pub altitude_km: f64,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            number_of_planes: 4,
            sats_per_plane: 4,
            altitude_km: 550.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundStationConfig {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub period_s: f64,
    pub ttl_s: f64,
    /// Fixed destination; hashed from the constellation size when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<NodeId>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            period_s: 5.0,
            ttl_s: 120.0,
            destination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub constellation: ConstellationConfig,
    pub ground_station: GroundStationConfig,
    pub scenario: Scenario,
    pub duration_s: f64,
    pub timestep_s: f64,
    pub traffic: TrafficConfig,
    pub history_capacity: usize,
    pub adaptive: AdaptiveConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            constellation: ConstellationConfig::default(),
            ground_station: GroundStationConfig::default(),
            scenario: Scenario::Stable,
            duration_s: 600.0,
            timestep_s: 1.0,
            traffic: TrafficConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            adaptive: AdaptiveConfig::default(),
        }
    }
}

fn require_positive(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

impl SimulationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        Ok(config)
    }

    pub fn walker(&self) -> std::result::Result<WalkerConstellation, ConfigError> {
        let c = &self.constellation;
        WalkerConstellation::new(c.number_of_planes, c.sats_per_plane, c.altitude_km)
            .map_err(|e| ConfigError::Constellation(e.to_string()))
    }

    pub fn ground_station(&self) -> std::result::Result<GroundStation, ConfigError> {
        let g = &self.ground_station;
        GroundStation::new(g.lat_deg, g.lon_deg, g.alt_m)
            .map_err(|e| ConfigError::GroundStation(e.to_string()))
    }

    /// Configured destination, or the hashed default for this size
    pub fn destination(&self) -> std::result::Result<NodeId, ConfigError> {
        let walker = self.walker()?;
        match self.traffic.destination {
            Some(NodeId::Satellite(id)) if walker.contains(id) => Ok(NodeId::Satellite(id)),
            Some(other) => Err(ConfigError::UnknownDestination(other)),
            None => Ok(default_destination(&walker)),
        }
    }

    /// Number of timesteps in the run
    pub fn steps(&self) -> u64 {
        (self.duration_s / self.timestep_s).floor() as u64
    }

    /// Checks everything a run needs before the first step
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.walker()?;
        self.ground_station()?;

        require_positive("duration_s", self.duration_s)?;
        require_positive("timestep_s", self.timestep_s)?;
        require_positive("traffic.period_s", self.traffic.period_s)?;
        require_positive("traffic.ttl_s", self.traffic.ttl_s)?;
        if self.duration_s < self.timestep_s {
            return Err(ConfigError::DurationBelowTimestep {
                duration_s: self.duration_s,
                timestep_s: self.timestep_s,
            });
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if !self.adaptive.instability_penalty.is_finite() || self.adaptive.instability_penalty < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "adaptive.instability_penalty",
                value: self.adaptive.instability_penalty,
            });
        }

        self.destination()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimError;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.steps(), 600);
        assert_eq!(config.history_capacity, 10);
        assert!(config.destination().unwrap().is_satellite());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "constellation": {"number_of_planes": 6, "sats_per_plane": 6},
            "scenario": "disrupted",
            "traffic": {"destination": "sat_2_3"}
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.constellation.number_of_planes, 6);
        assert_eq!(config.constellation.altitude_km, 550.0);
        assert_eq!(config.scenario, Scenario::Disrupted);
        assert_eq!(config.traffic.ttl_s, 120.0);
        assert_eq!(config.destination().unwrap(), NodeId::satellite(2, 3));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = SimulationConfig::default();
        config.constellation.number_of_planes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Constellation(_))));

        let mut config = SimulationConfig::default();
        config.ground_station.lat_deg = 95.0;
        assert!(matches!(config.validate(), Err(ConfigError::GroundStation(_))));

        let mut config = SimulationConfig::default();
        config.ground_station.alt_m = -7_000_000.0;
        assert!(matches!(config.validate(), Err(ConfigError::GroundStation(_))));

        let mut config = SimulationConfig::default();
        config.timestep_s = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive { field: "timestep_s", value: 0.0 })
        );

        let mut config = SimulationConfig::default();
        config.traffic.ttl_s = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositive { .. })));

        let mut config = SimulationConfig::default();
        config.history_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroHistoryCapacity));

        let mut config = SimulationConfig::default();
        config.traffic.destination = Some(NodeId::satellite(4, 0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownDestination(NodeId::satellite(4, 0)))
        );

        let mut config = SimulationConfig::default();
        config.traffic.destination = Some(NodeId::Ground);
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.duration_s = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::DurationBelowTimestep { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"duration_s": 120, "scenario": "stable"}}"#).unwrap();

        let config = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.duration_s, 120.0);
        assert_eq!(config.steps(), 120);
    }

    #[test]
    fn test_load_errors() {
        let missing = SimulationConfig::from_json_file("/nonexistent/config.json");
        assert!(matches!(missing, Err(SimError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        let bad = SimulationConfig::from_json_file(file.path());
        assert!(matches!(bad, Err(SimError::Json(_))));
    }
}
