//! Ground station geometry
//!
//! A single fixed station on a spherical Earth. Its position never changes
//! during a run.

use crate::{transforms, OrbitalError, Position, Result, EARTH_RADIUS_KM};
use serde::{Deserialize, Serialize};

fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundStation {
    pub location: GeoLocation,
    position: Position,
}

impl GroundStation {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<Self> {
        if !is_valid_latitude(latitude_deg) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                latitude_deg
            )));
        }
        if !is_valid_longitude(longitude_deg) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                longitude_deg
            )));
        }
        if !altitude_m.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "altitude {} is not finite",
                altitude_m
            )));
        }
        if EARTH_RADIUS_KM + altitude_m / 1000.0 <= 0.0 {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "altitude {} m puts the station at or below the Earth's centre",
                altitude_m
            )));
        }

        let location = GeoLocation {
            latitude_deg,
            longitude_deg,
            altitude_m,
        };
        let position =
            transforms::geodetic_to_cartesian(latitude_deg, longitude_deg, altitude_m / 1000.0);

        Ok(Self { location, position })
    }

    /// Earth-centred position (km)
    pub fn position(&self) -> Position {
        self.position
    }

    /// Elevation of `target` above this station's horizon, in degrees
    pub fn elevation_deg(&self, target: &Position) -> f64 {
        transforms::elevation_rad(&self.position, target).to_degrees()
    }
}
