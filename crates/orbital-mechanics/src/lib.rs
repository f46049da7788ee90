//! Orbital Mechanics Library
//!
//! Circular-orbit propagation, ground station geometry and Walker constellation
//! layout for the routing simulator.
//!
//! Every satellite flies a circular orbit (eccentricity 0) at a common altitude.
//! Positions are expressed in a single Earth-centred frame in kilometres; the
//! ground station is fixed in that frame, so the whole geometry at time `t` is a
//! pure function of the constellation parameters and `t`.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use thiserror::Error;

pub mod ground;

pub use ground::GroundStation;
pub use walker::WalkerConstellation;

/// Mean equatorial Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// Earth gravitational parameter (km^3/s^2)
pub const EARTH_MU_KM3_S2: f64 = 398600.4418;

/// Inclination of the first orbital plane (degrees)
pub const MIN_INCLINATION_DEG: f64 = 30.0;

/// Inclination of the last orbital plane (degrees)
pub const MAX_INCLINATION_DEG: f64 = 80.0;

/// Position in the Earth-centred frame (km)
pub type Position = Vector3<f64>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitalError {
    #[error("Invalid constellation: {0}")]
    InvalidConstellation(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Identity of a satellite inside the constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SatelliteId {
    pub plane: u32,
    pub slot: u32,
}

impl SatelliteId {
    pub fn new(plane: u32, slot: u32) -> Self {
        Self { plane, slot }
    }
}

impl fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sat_{}_{}", self.plane, self.slot)
    }
}

/// Immutable orbital parameters of one satellite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Orbital radius (Earth radius + altitude), km
    pub radius_km: f64,
    pub inclination_rad: f64,
    pub raan_rad: f64,
    /// Anomaly at t = 0
    pub initial_phase_rad: f64,
    /// Angular rate sqrt(mu / r^3), rad/s
    pub mean_motion_rad_s: f64,
}

impl OrbitalElements {
    pub fn circular(radius_km: f64, inclination_deg: f64, raan_deg: f64, phase_deg: f64) -> Self {
        Self {
            radius_km,
            inclination_rad: inclination_deg.to_radians(),
            raan_rad: raan_deg.to_radians(),
            initial_phase_rad: phase_deg.to_radians(),
            mean_motion_rad_s: (EARTH_MU_KM3_S2 / radius_km.powi(3)).sqrt(),
        }
    }

    /// Orbital period (s)
    pub fn period_s(&self) -> f64 {
        TAU / self.mean_motion_rad_s
    }

    /// Anomaly at time `t`, wrapped to [0, 2π)
    pub fn anomaly_at(&self, t: f64) -> f64 {
        (self.initial_phase_rad + self.mean_motion_rad_s * t).rem_euclid(TAU)
    }

    /// Rotation taking the orbital plane into the Earth-centred frame:
    /// inclination about x first, then RAAN about z.
    pub fn plane_rotation(&self) -> Rotation3<f64> {
        let raan = Rotation3::from_axis_angle(&Vector3::z_axis(), self.raan_rad);
        let inclination = Rotation3::from_axis_angle(&Vector3::x_axis(), self.inclination_rad);
        raan * inclination
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    pub id: SatelliteId,
    pub elements: OrbitalElements,
}

impl Satellite {
    pub fn position(&self, t: f64) -> Position {
        propagation::position(self, t)
    }

    pub fn period_s(&self) -> f64 {
        self.elements.period_s()
    }
}

pub mod propagation {
    use super::*;

    /// Position of `satellite` at `t` seconds after simulation start.
    ///
    /// Pure and deterministic: the same inputs always give the same bits.
    pub fn position(satellite: &Satellite, t: f64) -> Position {
        let elements = &satellite.elements;
        let anomaly = elements.anomaly_at(t);

        let in_plane = Vector3::new(
            elements.radius_km * anomaly.cos(),
            elements.radius_km * anomaly.sin(),
            0.0,
        );

        elements.plane_rotation() * in_plane
    }
}

pub mod transforms {
    use super::*;

    /// Geodetic to Earth-centred position on a spherical Earth.
    pub fn geodetic_to_cartesian(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Position {
        let lat = latitude_deg.to_radians();
        let lon = longitude_deg.to_radians();
        let r = EARTH_RADIUS_KM + altitude_km;

        Vector3::new(r * lat.cos() * lon.cos(), r * lat.cos() * lon.sin(), r * lat.sin())
    }

    /// Elevation (radians) of `target` above the local horizon of `observer`.
    ///
    /// The local vertical is the direction from Earth's centre to the observer.
    pub fn elevation_rad(observer: &Position, target: &Position) -> f64 {
        let line_of_sight = target - observer;
        let up = observer.normalize();

        let vertical = line_of_sight.dot(&up);
        let horizontal = (line_of_sight - up * vertical).norm();

        vertical.atan2(horizontal)
    }
}

pub mod walker {
    use super::*;

    /// Walker constellation: `planes` evenly spaced in RAAN, `sats_per_plane`
    /// evenly phased inside each plane, one shared altitude. Plane
    /// inclinations are spread linearly from 30° (first plane) to 80° (last).
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct WalkerConstellation {
        pub planes: u32,
        pub sats_per_plane: u32,
        pub altitude_km: f64,
    }

    impl WalkerConstellation {
        pub fn new(planes: u32, sats_per_plane: u32, altitude_km: f64) -> Result<Self> {
            if planes == 0 {
                return Err(OrbitalError::InvalidConstellation(
                    "number_of_planes must be at least 1".to_string(),
                ));
            }
            if sats_per_plane == 0 {
                return Err(OrbitalError::InvalidConstellation(
                    "sats_per_plane must be at least 1".to_string(),
                ));
            }
            if !altitude_km.is_finite() || altitude_km <= 0.0 {
                return Err(OrbitalError::InvalidConstellation(format!(
                    "altitude_km must be positive, got {}",
                    altitude_km
                )));
            }

            Ok(Self {
                planes,
                sats_per_plane,
                altitude_km,
            })
        }

        pub fn total_satellites(&self) -> u32 {
            self.planes * self.sats_per_plane
        }

        pub fn orbital_radius_km(&self) -> f64 {
            EARTH_RADIUS_KM + self.altitude_km
        }

        pub fn plane_spacing_deg(&self) -> f64 {
            360.0 / self.planes as f64
        }

        pub fn in_plane_spacing_deg(&self) -> f64 {
            360.0 / self.sats_per_plane as f64
        }

        pub fn raan_deg(&self, plane: u32) -> f64 {
            plane as f64 * self.plane_spacing_deg()
        }

        pub fn inclination_deg(&self, plane: u32) -> f64 {
            if self.planes == 1 {
                return MIN_INCLINATION_DEG;
            }
            let fraction = plane as f64 / (self.planes - 1) as f64;
            MIN_INCLINATION_DEG + (MAX_INCLINATION_DEG - MIN_INCLINATION_DEG) * fraction
        }

        pub fn phase_deg(&self, slot: u32) -> f64 {
            slot as f64 * self.in_plane_spacing_deg()
        }

        pub fn contains(&self, id: SatelliteId) -> bool {
            id.plane < self.planes && id.slot < self.sats_per_plane
        }

        /// All satellites, ordered by plane then slot.
        pub fn satellites(&self) -> Vec<Satellite> {
            let radius = self.orbital_radius_km();
            let mut satellites = Vec::with_capacity(self.total_satellites() as usize);

            for plane in 0..self.planes {
                for slot in 0..self.sats_per_plane {
                    satellites.push(Satellite {
                        id: SatelliteId::new(plane, slot),
                        elements: OrbitalElements::circular(
                            radius,
                            self.inclination_deg(plane),
                            self.raan_deg(plane),
                            self.phase_deg(slot),
                        ),
                    });
                }
            }

            satellites
        }
    }
}
