// src/geo/coord.rs
//! Coordinate and position fix types

use crate::error::{NavError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic point in degrees.
///
/// Latitude is within [-90, 90]; longitude is normalized into (-180, 180]
/// on construction, so two coordinates naming the same meridian compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(NavError::InvalidCoordinate { lat, lon });
        }

        Ok(Self {
            lat,
            lon: normalize_longitude(lon),
        })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl TryFrom<(f64, f64)> for Coordinate {
    type Error = NavError;

    fn try_from((lat, lon): (f64, f64)) -> Result<Self> {
        Self::new(lat, lon)
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(c: Coordinate) -> Self {
        (c.lat, c.lon)
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    if lon > -180.0 && lon <= 180.0 {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// A timestamped position observation from the location source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub coordinate: Coordinate,
    pub accuracy_m: f64,
    pub bearing_deg: Option<f64>, // None when the source has no heading
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn new(
        coordinate: Coordinate,
        accuracy_m: f64,
        bearing_deg: Option<f64>,
        speed_mps: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if !accuracy_m.is_finite() || accuracy_m < 0.0 {
            return Err(NavError::InvalidInput(format!(
                "accuracy must be >= 0, got {}",
                accuracy_m
            )));
        }
        if !speed_mps.is_finite() || speed_mps < 0.0 {
            return Err(NavError::InvalidInput(format!("speed must be >= 0, got {}", speed_mps)));
        }

        Ok(Self {
            coordinate,
            accuracy_m,
            bearing_deg: bearing_deg
                .filter(|b| b.is_finite())
                .map(super::math::normalize_degrees),
            speed_mps,
            timestamp,
        })
    }

    /// Fix at `coordinate` with no motion information, stamped now
    pub fn stationary(coordinate: Coordinate, accuracy_m: f64) -> Self {
        Self {
            coordinate,
            accuracy_m: accuracy_m.max(0.0),
            bearing_deg: None,
            speed_mps: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// Get the age of the fix in seconds relative to `now`
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        now.signed_duration_since(self.timestamp).num_milliseconds() as f64 / 1000.0
    }
}
