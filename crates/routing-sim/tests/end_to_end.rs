//! Full runs through the public API

use orbital_topology::{HistoryBuffer, NodeId, Scenario, TopologySnapshot};
use routing_sim::{
    run_matrix, scaling_sweep, BaselineRouter, DropReason, Packet, Router, RouterKind, RoutingError,
    SimulationConfig, SimulationEngine,
};
use std::collections::HashSet;

fn config(scenario: Scenario, duration_s: f64) -> SimulationConfig {
    SimulationConfig {
        scenario,
        duration_s,
        ..SimulationConfig::default()
    }
}

/// Traffic to sat_0_0, which starts directly above the ground station
fn overhead_config(scenario: Scenario, duration_s: f64) -> SimulationConfig {
    let mut cfg = config(scenario, duration_s);
    cfg.traffic.destination = Some(NodeId::satellite(0, 0));
    cfg
}

/// Panics for every packet
struct PanickingRouter;

impl Router for PanickingRouter {
    fn name(&self) -> &str {
        "panicking"
    }

    fn next_hop(
        &self,
        _packet: &Packet,
        _snapshot: &TopologySnapshot,
        _time_s: f64,
        _history: &HistoryBuffer,
    ) -> Result<Option<NodeId>, RoutingError> {
        panic!("router bug")
    }
}

/// Always sends the packet to a node that does not exist
struct TeleportRouter;

impl Router for TeleportRouter {
    fn name(&self) -> &str {
        "teleport"
    }

    fn next_hop(
        &self,
        _packet: &Packet,
        _snapshot: &TopologySnapshot,
        _time_s: f64,
        _history: &HistoryBuffer,
    ) -> Result<Option<NodeId>, RoutingError> {
        Ok(Some(NodeId::satellite(40, 40)))
    }
}

/// Shortest path, checking every hop it returns is a neighbour
struct CheckedBaseline;

impl Router for CheckedBaseline {
    fn name(&self) -> &str {
        "checked"
    }

    fn next_hop(
        &self,
        packet: &Packet,
        snapshot: &TopologySnapshot,
        time_s: f64,
        history: &HistoryBuffer,
    ) -> Result<Option<NodeId>, RoutingError> {
        let hop = BaselineRouter::new().next_hop(packet, snapshot, time_s, history)?;
        if let Some(hop) = hop {
            assert!(snapshot.has_edge(packet.current_node(), hop));
        }
        Ok(hop)
    }
}

#[test]
fn test_identical_runs_give_identical_artifacts() {
    let cfg = config(Scenario::Stable, 120.0);
    let first = run_matrix(&cfg, &Scenario::ALL, &RouterKind::ALL).unwrap();
    let second = run_matrix(&cfg, &Scenario::ALL, &RouterKind::ALL).unwrap();

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}

#[test]
fn test_every_packet_ends_exactly_once() {
    for scenario in Scenario::ALL {
        for router in RouterKind::ALL {
            let cfg = config(scenario, 300.0);
            let mut engine = SimulationEngine::new(&cfg, router.build(&cfg)).unwrap();
            let report = engine.run();

            assert_eq!(report.total_sent, 60);
            assert_eq!(report.total_sent, report.total_delivered + report.total_dropped);
            assert_eq!(report.total_dropped, report.drop_reasons.values().sum::<usize>());
            assert_eq!(report.drops(DropReason::RouterError), 0);
        }
    }
}

#[test]
fn test_ttl_never_increases_and_hops_are_single() {
    let cfg = config(Scenario::Stable, 200.0);
    let mut engine = SimulationEngine::new(&cfg, Box::new(CheckedBaseline)).unwrap();
    let mut last: std::collections::HashMap<u64, (f64, u32)> = std::collections::HashMap::new();

    while engine.step().is_some() {
        for packet in engine.in_flight() {
            let (ttl, hops) = (packet.ttl_remaining_s(), packet.hops());
            if let Some((prev_ttl, prev_hops)) = last.get(&packet.id().0) {
                assert!(ttl < *prev_ttl);
                assert!(hops <= prev_hops + 1);
            }
            last.insert(packet.id().0, (ttl, hops));
        }
    }

    let report = engine.run();
    assert_eq!(report.drops(DropReason::RouterError), 0);
}

#[test]
fn test_disrupted_delivers_less_than_stable() {
    // The 15° mask loses sat_0_0 well before the 5° mask does
    let cfg = overhead_config(Scenario::Stable, 240.0);
    let artifacts = run_matrix(&cfg, &Scenario::ALL, &[RouterKind::Baseline]).unwrap();
    let (stable, disrupted) = (&artifacts[0].metrics, &artifacts[1].metrics);

    assert!(stable.delivery_rate > 0.0);
    assert!(disrupted.delivery_rate > 0.0);
    assert!(
        disrupted.delivery_rate < stable.delivery_rate,
        "disrupted {} stable {}",
        disrupted.delivery_rate,
        stable.delivery_rate
    );
}

#[test]
fn test_panicking_router_is_contained() {
    let cfg = config(Scenario::Stable, 50.0);
    let mut engine = SimulationEngine::new(&cfg, Box::new(PanickingRouter)).unwrap();
    let report = engine.run();

    assert_eq!(report.total_sent, 10);
    assert_eq!(report.drops(DropReason::RouterError), 10);
}

#[test]
fn test_out_of_topology_hop_is_no_route() {
    let cfg = config(Scenario::Stable, 50.0);
    let mut engine = SimulationEngine::new(&cfg, Box::new(TeleportRouter)).unwrap();
    let report = engine.run();

    assert_eq!(report.drops(DropReason::NoRoute), 10);
    assert_eq!(report.total_delivered, 0);
}

#[test]
fn test_sweep_uses_distinct_sizes() {
    let cfg = config(Scenario::Stable, 60.0);
    let artifacts = scaling_sweep(&cfg, &[(4, 4), (6, 6), (8, 8)]).unwrap();

    let sizes: HashSet<u32> = artifacts
        .iter()
        .map(|a| a.settings.number_of_planes * a.settings.sats_per_plane)
        .collect();
    assert_eq!(sizes, HashSet::from([16, 36, 64]));
}

#[test]
fn test_stable_baseline_regression_threshold() {
    // sat_0_0 stays above the 5° mask for the whole window
    let cfg = overhead_config(Scenario::Stable, 240.0);
    let artifacts = run_matrix(&cfg, &[Scenario::Stable], &[RouterKind::Baseline]).unwrap();
    let metrics = &artifacts[0].metrics;

    assert_eq!(metrics.total_sent, 48);
    assert!(metrics.delivery_rate >= 0.95, "delivery rate {}", metrics.delivery_rate);
    assert_eq!(metrics.drops(DropReason::RouterError), 0);
    assert_eq!(metrics.drops(DropReason::SimulationEnded), 0);
}

#[test]
fn test_delivery_does_not_degrade_with_size() {
    let cfg = overhead_config(Scenario::Stable, 600.0);
    let artifacts = scaling_sweep(&cfg, &[(4, 4), (6, 6), (8, 8)]).unwrap();
    let rates: Vec<f64> = artifacts.iter().map(|a| a.metrics.delivery_rate).collect();

    assert!(rates[0] > 0.0, "delivery rates {:?}", rates);
    for pair in rates.windows(2) {
        assert!(pair[1] + 0.05 >= pair[0], "delivery rates {:?}", rates);
    }
}

#[test]
fn test_bundled_scenario_files_load() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/scenarios");
    for (file, scenario) in [("stable.json", Scenario::Stable), ("disrupted.json", Scenario::Disrupted)] {
        let cfg = SimulationConfig::from_json_file(dir.join(file)).unwrap();
        assert_eq!(cfg.scenario, scenario);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.steps(), 600);
    }
}
