//! Line-of-sight visibility
//!
//! Decides, for a pair of node positions, whether a link exists and how long
//! it is. Inter-satellite links need range and a clear line of sight past the
//! Earth; ground links need the satellite above the station's elevation mask.

use crate::{Link, LinkKind, NodeId, TopologyError};
use orbital_mechanics::{transforms, Position, EARTH_RADIUS_KM};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Thresholds driving link feasibility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityParams {
    /// Maximum inter-satellite link range (km)
    pub max_isl_range_km: f64,
    /// Minimum elevation above the ground station horizon (degrees)
    pub min_elevation_deg: f64,
}

impl VisibilityParams {
    pub const STABLE: Self = Self {
        max_isl_range_km: 5000.0,
        min_elevation_deg: 5.0,
    };

    pub const DISRUPTED: Self = Self {
        max_isl_range_km: 3000.0,
        min_elevation_deg: 15.0,
    };
}

impl Default for VisibilityParams {
    fn default() -> Self {
        Self::STABLE
    }
}

/// Named connectivity scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Nominal link ranges and elevation mask
    #[default]
    Stable,
    /// Shorter ISL range and a stricter elevation mask
    Disrupted,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Stable, Scenario::Disrupted];

    pub fn params(&self) -> VisibilityParams {
        match self {
            Scenario::Stable => VisibilityParams::STABLE,
            Scenario::Disrupted => VisibilityParams::DISRUPTED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Stable => "stable",
            Scenario::Disrupted => "disrupted",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Scenario::Stable),
            "disrupted" => Ok(Scenario::Disrupted),
            other => Err(TopologyError::UnknownScenario(other.to_string())),
        }
    }
}

/// Stateless link feasibility checks for one parameter set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEngine {
    params: VisibilityParams,
}

impl VisibilityEngine {
    pub fn new(params: VisibilityParams) -> Self {
        Self { params }
    }

    pub fn for_scenario(scenario: Scenario) -> Self {
        Self::new(scenario.params())
    }

    pub fn params(&self) -> VisibilityParams {
        self.params
    }

    /// Returns the link length when a link of `kind` exists.
    ///
    /// For [`LinkKind::Ground`], `a` is the satellite and `b` the ground station.
    pub fn link_exists(&self, a: &Position, b: &Position, kind: LinkKind) -> Option<f64> {
        match kind {
            LinkKind::InterSatellite => self.isl_distance(a, b),
            LinkKind::Ground => self.ground_distance(a, b),
        }
    }

    /// Inter-satellite link: in range and not occluded by the Earth
    pub fn isl_distance(&self, a: &Position, b: &Position) -> Option<f64> {
        let distance = (b - a).norm();
        if distance > self.params.max_isl_range_km {
            return None;
        }
        if !segment_clears_earth(a, b) {
            return None;
        }
        Some(distance)
    }

    /// Ground link: satellite at or above the elevation mask
    pub fn ground_distance(&self, satellite: &Position, ground: &Position) -> Option<f64> {
        let elevation_deg = transforms::elevation_rad(ground, satellite).to_degrees();
        if elevation_deg < self.params.min_elevation_deg {
            return None;
        }
        Some((satellite - ground).norm())
    }

    /// Classifies the pair by node kind and checks the matching rule.
    ///
    /// Symmetric in its arguments. Two ground nodes never link.
    pub fn check_pair(&self, a: (NodeId, &Position), b: (NodeId, &Position)) -> Option<Link> {
        let (id_a, pos_a) = a;
        let (id_b, pos_b) = b;

        if id_a == id_b {
            return None;
        }

        match (id_a, id_b) {
            (NodeId::Satellite(_), NodeId::Satellite(_)) => self
                .isl_distance(pos_a, pos_b)
                .map(|d| Link::new(LinkKind::InterSatellite, d)),
            (NodeId::Satellite(_), NodeId::Ground) => self
                .ground_distance(pos_a, pos_b)
                .map(|d| Link::new(LinkKind::Ground, d)),
            (NodeId::Ground, NodeId::Satellite(_)) => self
                .ground_distance(pos_b, pos_a)
                .map(|d| Link::new(LinkKind::Ground, d)),
            (NodeId::Ground, NodeId::Ground) => None,
        }
    }
}

impl Default for VisibilityEngine {
    fn default() -> Self {
        Self::new(VisibilityParams::default())
    }
}

fn lexicographic(a: &Position, b: &Position) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// True when the closest point of segment `a`-`b` to the Earth's centre is at
/// least one Earth radius away.
///
/// Endpoints are put in a fixed order first so swapping them yields the same bits.
pub fn segment_clears_earth(a: &Position, b: &Position) -> bool {
    let (p, q) = match lexicographic(a, b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };

    let d = q - p;
    let length_sq = d.norm_squared();
    if length_sq < 1e-12 {
        return p.norm() >= EARTH_RADIUS_KM;
    }

    let t = (-p.dot(&d) / length_sq).clamp(0.0, 1.0);
    let closest = p + d * t;
    closest.norm() >= EARTH_RADIUS_KM
}
