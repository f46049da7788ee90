//! Periodic packet emission
//!
//! One packet per period from the source node to a single destination. The
//! default destination is a satellite chosen by hashing the constellation
//! size, so every run of a given size targets the same node.

use crate::packet::{Packet, PacketId};
use orbital_mechanics::{SatelliteId, WalkerConstellation};
use orbital_topology::NodeId;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Absorbs float error in `t` accumulated from the step index
const EMISSION_EPSILON_S: f64 = 1e-9;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic default destination for a constellation size.
///
/// The high half of the hash is folded into the low half before the modulo;
/// the low bits of FNV-1a alone repeat across power-of-two sized constellations.
pub fn default_destination(constellation: &WalkerConstellation) -> NodeId {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&constellation.planes.to_le_bytes());
    key[4..].copy_from_slice(&constellation.sats_per_plane.to_le_bytes());

    let hash = fnv1a(&key);
    let index = (hash ^ (hash >> 32)) % u64::from(constellation.total_satellites());
    let plane = (index / u64::from(constellation.sats_per_plane)) as u32;
    let slot = (index % u64::from(constellation.sats_per_plane)) as u32;

    NodeId::Satellite(SatelliteId::new(plane, slot))
}

#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    period_s: f64,
    ttl_s: f64,
    src: NodeId,
    dst: NodeId,
    next_id: u64,
    next_emission_s: f64,
}

impl TrafficGenerator {
    /// First packet goes out at t = 0
    pub fn new(period_s: f64, ttl_s: f64, src: NodeId, dst: NodeId) -> Self {
        Self {
            period_s,
            ttl_s,
            src,
            dst,
            next_id: 0,
            next_emission_s: 0.0,
        }
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    /// Packets emitted so far
    pub fn emitted(&self) -> u64 {
        self.next_id
    }

    /// Packets due at or before `t`, all stamped with `t`
    pub fn generate(&mut self, t: f64) -> Vec<Packet> {
        let mut packets = Vec::new();

        while self.next_emission_s <= t + EMISSION_EPSILON_S {
            packets.push(Packet::new(PacketId(self.next_id), self.src, self.dst, t, self.ttl_s));
            self.next_id += 1;
            self.next_emission_s += self.period_s;
        }

        packets
    }
}
