//! Constellation Routing Simulator CLI
//!
//! Runs every requested (scenario, router) combination and writes one JSON
//! result file per combination.
//!
//! Usage:
//!   routing-sim --scenario all --router all --output-dir outputs
//!   routing-sim --config sim.json --scenario disrupted --router adaptive
//!   routing-sim --planes 8 --sats-per-plane 8 --duration 300

use anyhow::Result;
use clap::{Parser, ValueEnum};
use orbital_topology::Scenario;
use routing_sim::{run_matrix, RouterKind, SimulationConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioArg {
    Stable,
    Disrupted,
    All,
}

impl ScenarioArg {
    fn scenarios(self) -> Vec<Scenario> {
        match self {
            ScenarioArg::Stable => vec![Scenario::Stable],
            ScenarioArg::Disrupted => vec![Scenario::Disrupted],
            ScenarioArg::All => Scenario::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RouterArg {
    Baseline,
    Adaptive,
    All,
}

impl RouterArg {
    fn routers(self) -> Vec<RouterKind> {
        match self {
            RouterArg::Baseline => vec![RouterKind::Baseline],
            RouterArg::Adaptive => vec![RouterKind::Adaptive],
            RouterArg::All => RouterKind::ALL.to_vec(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "routing-sim",
    about = "Simulate packet routing over a Walker satellite constellation"
)]
struct Args {
    /// JSON configuration file (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario to run
    #[arg(short, long, value_enum, default_value_t = ScenarioArg::All)]
    scenario: ScenarioArg,

    /// Router to evaluate
    #[arg(short, long, value_enum, default_value_t = RouterArg::All)]
    router: RouterArg,

    /// Directory for result files
    #[arg(short, long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Override the number of orbital planes
    #[arg(long)]
    planes: Option<u32>,

    /// Override the number of satellites per plane
    #[arg(long)]
    sats_per_plane: Option<u32>,

    /// Override the simulated duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(planes) = args.planes {
        config.constellation.number_of_planes = planes;
    }
    if let Some(sats) = args.sats_per_plane {
        config.constellation.sats_per_plane = sats;
    }
    if let Some(duration) = args.duration {
        config.duration_s = duration;
    }

    info!("{}", "=".repeat(60));
    info!("Constellation Routing Simulator");
    info!("{}", "=".repeat(60));

    let artifacts = run_matrix(&config, &args.scenario.scenarios(), &args.router.routers())?;

    for artifact in &artifacts {
        let path = artifact.write_to_dir(&args.output_dir)?;
        info!("Wrote {:?}", path);
    }

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    for artifact in &artifacts {
        let m = &artifact.metrics;
        info!(
            "  {:10} {:9} delivered {:4}/{:<4} ({:5.1}%)  latency mean {:6.2}s  p95 {:6.2}s",
            artifact.scenario.as_str(),
            artifact.router.as_str(),
            m.total_delivered,
            m.total_sent,
            m.delivery_rate * 100.0,
            m.latency_mean,
            m.latency_p95
        );
        for (reason, count) in &m.drop_reasons {
            info!("      {}: {}", reason, count);
        }
    }

    Ok(())
}
