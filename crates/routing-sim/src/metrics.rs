//! Delivery and latency metrics

use crate::packet::{DropReason, Packet, PacketState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending; `q` is in [0, 100]. Empty input gives 0.0.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Final metrics of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub total_sent: usize,
    pub total_delivered: usize,
    pub total_dropped: usize,
    pub delivery_rate: f64,
    /// Seconds, delivered packets only
    pub latency_mean: f64,
    pub latency_median: f64,
    pub latency_p95: f64,
    pub drop_reasons: BTreeMap<DropReason, usize>,
}

impl MetricsReport {
    pub fn drops(&self, reason: DropReason) -> usize {
        self.drop_reasons.get(&reason).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    sent: usize,
    delivered: usize,
    latencies_s: Vec<f64>,
    drop_reasons: BTreeMap<DropReason, usize>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self, _packet: &Packet) {
        self.sent += 1;
    }

    /// Records a packet that reached a terminal state; in-flight packets are ignored
    pub fn record_terminal(&mut self, packet: &Packet) {
        match packet.state() {
            PacketState::InFlight => {}
            PacketState::Delivered { at_s } => {
                self.delivered += 1;
                self.latencies_s.push(at_s - packet.created_at_s());
            }
            PacketState::Dropped { reason, .. } => {
                *self.drop_reasons.entry(reason).or_insert(0) += 1;
            }
        }
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn dropped(&self) -> usize {
        self.drop_reasons.values().sum()
    }

    pub fn finalize(&self) -> MetricsReport {
        let mut sorted = self.latencies_s.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let latency_mean = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        let delivery_rate = if self.sent == 0 {
            0.0
        } else {
            self.delivered as f64 / self.sent as f64
        };

        MetricsReport {
            total_sent: self.sent,
            total_delivered: self.delivered,
            total_dropped: self.dropped(),
            delivery_rate,
            latency_mean,
            latency_median: percentile(&sorted, 50.0),
            latency_p95: percentile(&sorted, 95.0),
            drop_reasons: self.drop_reasons.clone(),
        }
    }
}
