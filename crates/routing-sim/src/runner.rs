//! Run orchestration and result artifacts
//!
//! Runs (scenario, router) combinations and constellation size sweeps. All
//! configurations are validated before the first run, so a bad setting never
//! leaves a partial set of results behind.

use crate::config::{GroundStationConfig, SimulationConfig, TrafficConfig};
use crate::engine::SimulationEngine;
use crate::metrics::MetricsReport;
use crate::router::RouterKind;
use crate::Result;
use orbital_topology::{NodeId, Scenario, VisibilityParams};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Settings a run actually used, recorded next to its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub number_of_planes: u32,
    pub sats_per_plane: u32,
    pub altitude_km: f64,
    pub ground_station: GroundStationConfig,
    pub visibility: VisibilityParams,
    pub duration_s: f64,
    pub timestep_s: f64,
    pub traffic: TrafficConfig,
    pub history_capacity: usize,
}

impl RunSettings {
    fn from_config(config: &SimulationConfig) -> Result<Self> {
        let destination: NodeId = config.destination()?;
        Ok(Self {
            number_of_planes: config.constellation.number_of_planes,
            sats_per_plane: config.constellation.sats_per_plane,
            altitude_km: config.constellation.altitude_km,
            ground_station: config.ground_station,
            visibility: config.scenario.params(),
            duration_s: config.duration_s,
            timestep_s: config.timestep_s,
            traffic: TrafficConfig {
                destination: Some(destination),
                ..config.traffic
            },
            history_capacity: config.history_capacity,
        })
    }
}

/// Result of one (scenario, router) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    pub scenario: Scenario,
    pub router: RouterKind,
    pub settings: RunSettings,
    pub metrics: MetricsReport,
}

impl RunArtifact {
    pub fn file_name(&self) -> String {
        format!("results_{}_{}.json", self.scenario, self.router)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the artifact into `dir`, creating it if needed
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(self.file_name());
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(path)
    }
}

/// Runs one configuration with one in-tree router
pub fn run_single(config: &SimulationConfig, router: RouterKind) -> Result<RunArtifact> {
    let settings = RunSettings::from_config(config)?;
    let mut engine = SimulationEngine::new(config, router.build(config))?;
    let metrics = engine.run();

    Ok(RunArtifact {
        scenario: config.scenario,
        router,
        settings,
        metrics,
    })
}

/// Every scenario against every router, scenario-major
pub fn run_matrix(
    config: &SimulationConfig,
    scenarios: &[Scenario],
    routers: &[RouterKind],
) -> Result<Vec<RunArtifact>> {
    let configs: Vec<SimulationConfig> = scenarios
        .iter()
        .map(|scenario| SimulationConfig {
            scenario: *scenario,
            ..config.clone()
        })
        .collect();
    for c in &configs {
        c.validate()?;
    }

    let mut artifacts = Vec::with_capacity(configs.len() * routers.len());
    for c in &configs {
        for router in routers {
            info!("Running scenario={} router={}", c.scenario, router);
            artifacts.push(run_single(c, *router)?);
        }
    }

    Ok(artifacts)
}

/// Baseline router over several `(planes, sats_per_plane)` sizes.
///
/// A configured destination is kept for every size that contains it; sizes
/// without it fall back to their own hashed default.
pub fn scaling_sweep(config: &SimulationConfig, sizes: &[(u32, u32)]) -> Result<Vec<RunArtifact>> {
    let configs: Vec<SimulationConfig> = sizes
        .iter()
        .map(|(planes, sats)| {
            let mut sized = config.clone();
            sized.constellation.number_of_planes = *planes;
            sized.constellation.sats_per_plane = *sats;
            if let (Some(NodeId::Satellite(id)), Ok(walker)) = (sized.traffic.destination, sized.walker()) {
                if !walker.contains(id) {
                    sized.traffic.destination = None;
                }
            }
            sized
        })
        .collect();
    for c in &configs {
        c.validate()?;
    }

    configs
        .iter()
        .map(|c| {
            info!(
                "Scaling run: {}x{} ({} satellites)",
                c.constellation.number_of_planes,
                c.constellation.sats_per_plane,
                c.constellation.number_of_planes * c.constellation.sats_per_plane
            );
            run_single(c, RouterKind::Baseline)
        })
        .collect()
}
