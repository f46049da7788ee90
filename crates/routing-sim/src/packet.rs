//! Packets and their lifecycle
//!
//! A packet is created in flight at the ground station and ends in exactly
//! one terminal state. Only the engine moves it or changes its state;
//! routers get a shared reference.

use orbital_topology::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkt_{}", self.0)
    }
}

/// Why a packet left the network undelivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Time budget used up before reaching the destination
    TtlExpired,
    /// Router had no path, or proposed a hop that is not a current link
    NoRoute,
    /// Router failed while computing the hop
    RouterError,
    /// Still in flight when the run stopped
    SimulationEnded,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::TtlExpired => "ttl_expired",
            DropReason::NoRoute => "no_route",
            DropReason::RouterError => "router_error",
            DropReason::SimulationEnded => "simulation_ended",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PacketState {
    InFlight,
    Delivered { at_s: f64 },
    Dropped { reason: DropReason, at_s: f64 },
}

impl PacketState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PacketState::InFlight)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    id: PacketId,
    src: NodeId,
    dst: NodeId,
    created_at_s: f64,
    current_node: NodeId,
    ttl_remaining_s: f64,
    hops: u32,
    state: PacketState,
}

impl Packet {
    pub fn new(id: PacketId, src: NodeId, dst: NodeId, created_at_s: f64, ttl_s: f64) -> Self {
        Self {
            id,
            src,
            dst,
            created_at_s,
            current_node: src,
            ttl_remaining_s: ttl_s,
            hops: 0,
            state: PacketState::InFlight,
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    pub fn created_at_s(&self) -> f64 {
        self.created_at_s
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    pub fn ttl_remaining_s(&self) -> f64 {
        self.ttl_remaining_s
    }

    /// Links traversed so far
    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn at_destination(&self) -> bool {
        self.current_node == self.dst
    }

    /// Seconds from creation to delivery
    pub fn latency_s(&self) -> Option<f64> {
        match self.state {
            PacketState::Delivered { at_s } => Some(at_s - self.created_at_s),
            _ => None,
        }
    }

    pub(crate) fn decrement_ttl(&mut self, dt: f64) {
        self.ttl_remaining_s -= dt;
    }

    pub(crate) fn move_to(&mut self, node: NodeId) {
        debug_assert!(self.is_in_flight());
        self.current_node = node;
        self.hops += 1;
    }

    pub(crate) fn deliver(&mut self, at_s: f64) {
        if self.is_in_flight() {
            self.state = PacketState::Delivered { at_s };
        }
    }

    pub(crate) fn drop_with(&mut self, reason: DropReason, at_s: f64) {
        if self.is_in_flight() {
            self.state = PacketState::Dropped { reason, at_s };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_packet() -> Packet {
        Packet::new(PacketId(7), NodeId::Ground, NodeId::satellite(1, 2), 10.0, 120.0)
    }

    #[test]
    fn test_new_packet_starts_at_source() {
        let packet = create_test_packet();
        assert_eq!(packet.current_node(), NodeId::Ground);
        assert!(packet.is_in_flight());
        assert!(!packet.at_destination());
        assert_eq!(packet.latency_s(), None);
        assert_eq!(packet.id().to_string(), "pkt_7");
    }

    #[test]
    fn test_terminal_state_is_final() {
        let mut packet = create_test_packet();
        packet.move_to(NodeId::satellite(1, 2));
        packet.deliver(14.0);
        packet.drop_with(DropReason::TtlExpired, 15.0);

        assert_eq!(packet.state(), PacketState::Delivered { at_s: 14.0 });
        assert_eq!(packet.latency_s(), Some(4.0));
        assert_eq!(packet.hops(), 1);
    }

    #[test]
    fn test_drop_reason_wire_names() {
        let json = serde_json::to_string(&DropReason::SimulationEnded).unwrap();
        assert_eq!(json, "\"simulation_ended\"");
        assert_eq!(DropReason::NoRoute.to_string(), "no_route");
    }
}
