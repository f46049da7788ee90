//! Discrete-time simulation loop
//!
//! The engine owns every packet. Each step it rebuilds the topology, emits
//! new traffic, then gives each in-flight packet (ascending id) exactly one
//! hop or one terminal transition. A router failure or panic only costs the
//! packet it was routing.

use crate::config::SimulationConfig;
use crate::metrics::{MetricsCollector, MetricsReport};
use crate::packet::{DropReason, Packet, PacketId, PacketState};
use crate::router::Router;
use crate::traffic::TrafficGenerator;
use crate::Result;
use orbital_topology::{HistoryBuffer, NodeId, Scenario, TopologyBuilder, TopologySnapshot, VisibilityEngine};
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// What happened during one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepSummary {
    pub time_s: f64,
    pub links: usize,
    pub emitted: usize,
    pub delivered: usize,
    pub dropped: usize,
    pub in_flight: usize,
}

pub struct SimulationEngine {
    scenario: Scenario,
    topology: TopologyBuilder,
    traffic: TrafficGenerator,
    router: Box<dyn Router>,
    metrics: MetricsCollector,
    in_flight: BTreeMap<PacketId, Packet>,
    timestep_s: f64,
    total_steps: u64,
    next_step: u64,
    closed: bool,
}

impl SimulationEngine {
    /// Validates `config` and prepares a run; nothing is simulated yet
    pub fn new(config: &SimulationConfig, router: Box<dyn Router>) -> Result<Self> {
        config.validate()?;

        let walker = config.walker()?;
        let ground = config.ground_station()?;
        let destination = config.destination()?;

        let topology = TopologyBuilder::new(
            &walker,
            ground,
            VisibilityEngine::for_scenario(config.scenario),
            config.history_capacity,
        )?;
        let traffic = TrafficGenerator::new(
            config.traffic.period_s,
            config.traffic.ttl_s,
            NodeId::Ground,
            destination,
        );

        info!(
            "Simulation: {} satellites ({}x{}), scenario {}, router {}, destination {}, {} steps",
            walker.total_satellites(),
            walker.planes,
            walker.sats_per_plane,
            config.scenario,
            router.name(),
            destination,
            config.steps()
        );

        Ok(Self {
            scenario: config.scenario,
            topology,
            traffic,
            router,
            metrics: MetricsCollector::new(),
            in_flight: BTreeMap::new(),
            timestep_s: config.timestep_s,
            total_steps: config.steps(),
            next_step: 0,
            closed: false,
        })
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn router_name(&self) -> &str {
        self.router.name()
    }

    pub fn history(&self) -> &HistoryBuffer {
        self.topology.history()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &Packet> + '_ {
        self.in_flight.values()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn is_finished(&self) -> bool {
        self.next_step >= self.total_steps
    }

    /// Runs the next timestep; `None` once every configured step has run
    pub fn step(&mut self) -> Option<StepSummary> {
        if self.is_finished() {
            return None;
        }

        let t = self.next_step as f64 * self.timestep_s;
        self.next_step += 1;

        let snapshot = self.topology.advance(t);

        let emitted = self.traffic.generate(t);
        let emitted_count = emitted.len();
        for packet in emitted {
            self.metrics.record_sent(&packet);
            self.in_flight.insert(packet.id(), packet);
        }

        let router = self.router.as_ref();
        let history = self.topology.history();
        let mut finished = Vec::new();
        for packet in self.in_flight.values_mut() {
            advance_packet(router, packet, &snapshot, history, t, self.timestep_s);
            if !packet.is_in_flight() {
                finished.push(packet.id());
            }
        }

        let mut delivered = 0;
        for id in &finished {
            if let Some(packet) = self.in_flight.remove(id) {
                if matches!(packet.state(), PacketState::Delivered { .. }) {
                    delivered += 1;
                }
                self.metrics.record_terminal(&packet);
            }
        }

        let summary = StepSummary {
            time_s: t,
            links: snapshot.edge_count(),
            emitted: emitted_count,
            delivered,
            dropped: finished.len() - delivered,
            in_flight: self.in_flight.len(),
        };
        debug!(
            "t={}: {} links, {} emitted, {} delivered, {} dropped, {} in flight",
            t, summary.links, summary.emitted, summary.delivered, summary.dropped, summary.in_flight
        );

        Some(summary)
    }

    /// Settles whatever is still in flight at the end time.
    ///
    /// A packet that already sits at its destination is delivered, anything
    /// else is dropped as `simulation_ended`. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let end_s = self.next_step as f64 * self.timestep_s;
        let remaining = std::mem::take(&mut self.in_flight);
        if !remaining.is_empty() {
            debug!("{} packets still in flight at t={}", remaining.len(), end_s);
        }
        for (_, mut packet) in remaining {
            if packet.at_destination() {
                packet.deliver(end_s);
            } else {
                packet.drop_with(DropReason::SimulationEnded, end_s);
            }
            self.metrics.record_terminal(&packet);
        }
    }

    /// Runs all remaining steps, closes the run and returns its metrics
    pub fn run(&mut self) -> MetricsReport {
        while self.step().is_some() {}
        self.close();

        let report = self.metrics.finalize();
        info!(
            "Finished {} / {}: {}/{} delivered ({:.1}%), mean latency {:.2}s",
            self.scenario,
            self.router.name(),
            report.total_delivered,
            report.total_sent,
            report.delivery_rate * 100.0,
            report.latency_mean
        );
        report
    }
}

/// One step for one packet: a TTL tick, then delivery, drop or a single hop
fn advance_packet(
    router: &dyn Router,
    packet: &mut Packet,
    snapshot: &TopologySnapshot,
    history: &HistoryBuffer,
    t: f64,
    dt: f64,
) {
    packet.decrement_ttl(dt);

    if packet.at_destination() {
        packet.deliver(t);
        return;
    }
    if packet.ttl_remaining_s() <= 0.0 {
        packet.drop_with(DropReason::TtlExpired, t);
        return;
    }

    let decision = panic::catch_unwind(AssertUnwindSafe(|| {
        router.next_hop(packet, snapshot, t, history)
    }));

    match decision {
        Ok(Ok(Some(hop))) if snapshot.has_edge(packet.current_node(), hop) => {
            packet.move_to(hop);
        }
        Ok(Ok(Some(hop))) => {
            warn!(
                "{} proposed {} -> {} for {}, not a current link",
                router.name(),
                packet.current_node(),
                hop,
                packet.id()
            );
            packet.drop_with(DropReason::NoRoute, t);
        }
        Ok(Ok(None)) => packet.drop_with(DropReason::NoRoute, t),
        Ok(Err(e)) => {
            warn!("{} failed for {}: {}", router.name(), packet.id(), e);
            packet.drop_with(DropReason::RouterError, t);
        }
        Err(_) => {
            warn!("{} panicked routing {}", router.name(), packet.id());
            packet.drop_with(DropReason::RouterError, t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{BaselineRouter, RoutingError};
    use orbital_mechanics::SatelliteId;

    fn short_config() -> SimulationConfig {
        SimulationConfig {
            duration_s: 60.0,
            ..SimulationConfig::default()
        }
    }

    struct FixedRouter(std::result::Result<Option<NodeId>, RoutingError>);

    impl Router for FixedRouter {
        fn name(&self) -> &str {
            "fixed"
        }

        fn next_hop(
            &self,
            _packet: &Packet,
            _snapshot: &TopologySnapshot,
            _time_s: f64,
            _history: &HistoryBuffer,
        ) -> std::result::Result<Option<NodeId>, RoutingError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_step_count_and_times() {
        let mut engine = SimulationEngine::new(&short_config(), Box::new(BaselineRouter::new())).unwrap();
        let times: Vec<f64> = std::iter::from_fn(|| engine.step()).map(|s| s.time_s).collect();

        assert_eq!(times.len(), 60);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[59], 59.0);
        assert!(engine.is_finished());
        assert!(engine.step().is_none());
        assert_eq!(engine.history().len(), 10);
    }

    #[test]
    fn test_first_step_emits_and_routes() {
        let mut engine = SimulationEngine::new(&short_config(), Box::new(BaselineRouter::new())).unwrap();
        let summary = engine.step().unwrap();
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.emitted, summary.delivered + summary.dropped + summary.in_flight);

        for packet in engine.in_flight() {
            assert_eq!(packet.ttl_remaining_s(), 119.0);
            assert_eq!(packet.hops(), 1);
            assert_ne!(packet.current_node(), NodeId::Ground);
        }
    }

    #[test]
    fn test_none_drops_as_no_route() {
        let mut engine = SimulationEngine::new(&short_config(), Box::new(FixedRouter(Ok(None)))).unwrap();
        let report = engine.run();
        assert_eq!(report.total_sent, 12);
        assert_eq!(report.drops(DropReason::NoRoute), 12);
        assert_eq!(report.total_delivered, 0);
    }

    #[test]
    fn test_non_neighbor_drops_as_no_route() {
        let bogus = NodeId::Satellite(SatelliteId::new(99, 99));
        let mut engine = SimulationEngine::new(&short_config(), Box::new(FixedRouter(Ok(Some(bogus))))).unwrap();
        let report = engine.run();
        assert_eq!(report.drops(DropReason::NoRoute), report.total_sent);
    }

    #[test]
    fn test_router_error_drops_packet() {
        let router = FixedRouter(Err(RoutingError::Failed("model unavailable".to_string())));
        let mut engine = SimulationEngine::new(&short_config(), Box::new(router)).unwrap();
        let report = engine.run();
        assert_eq!(report.drops(DropReason::RouterError), report.total_sent);
    }

    #[test]
    fn test_close_is_idempotent() {
        let config = SimulationConfig {
            duration_s: 3.0,
            traffic: crate::config::TrafficConfig {
                ttl_s: 1000.0,
                ..Default::default()
            },
            ..SimulationConfig::default()
        };
        let mut engine = SimulationEngine::new(&config, Box::new(BaselineRouter::new())).unwrap();
        let report = engine.run();
        engine.close();

        assert_eq!(engine.metrics().finalize(), report);
        assert_eq!(engine.in_flight().count(), 0);
        assert_eq!(
            report.total_sent,
            report.total_delivered + report.total_dropped
        );
    }

    #[test]
    fn test_close_delivers_packet_on_final_hop() {
        // One step: the packet leaves the ground and lands on the satellite overhead
        let config = SimulationConfig {
            constellation: crate::config::ConstellationConfig {
                number_of_planes: 1,
                sats_per_plane: 1,
                ..Default::default()
            },
            duration_s: 1.0,
            traffic: crate::config::TrafficConfig {
                destination: Some(NodeId::satellite(0, 0)),
                ..Default::default()
            },
            ..SimulationConfig::default()
        };
        let mut engine = SimulationEngine::new(&config, Box::new(BaselineRouter::new())).unwrap();
        let report = engine.run();

        assert_eq!(report.total_sent, 1);
        assert_eq!(report.total_delivered, 1);
        assert_eq!(report.drops(DropReason::SimulationEnded), 0);
        assert_eq!(report.latency_mean, 1.0);
    }

    #[test]
    fn test_invalid_config_fails_before_running() {
        let mut config = short_config();
        config.timestep_s = -1.0;
        assert!(SimulationEngine::new(&config, Box::new(BaselineRouter::new())).is_err());
    }
}
