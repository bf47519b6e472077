// src/geo/math.rs
//! Distance, azimuth and projection helpers on a spherical Earth

use super::coord::Coordinate;
use serde::Serialize;
use std::f64::consts::{FRAC_PI_4, PI};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Latitude limit of the square Web Mercator world
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Planar Mercator point: `x` is longitude, `y` is Mercator latitude, both in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MercatorPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceAndAzimuth {
    pub distance_m: f64,
    /// Clockwise from north, reduced by the north offset, in [0, 360)
    pub azimuth_deg: f64,
}

/// Reduce an angle in degrees to [0, 360)
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

fn wrap_longitude_delta(d: f64) -> f64 {
    if d > 180.0 {
        d - 360.0
    } else if d < -180.0 {
        d + 360.0
    } else {
        d
    }
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (FRAC_PI_4 + lat / 2.0).tan().ln().to_degrees()
}

pub fn to_mercator(c: Coordinate) -> MercatorPoint {
    MercatorPoint {
        x: c.lon(),
        y: mercator_y(c.lat()),
    }
}

pub fn from_mercator(p: MercatorPoint) -> crate::error::Result<Coordinate> {
    let lat = (2.0 * p.y.to_radians().exp().atan() - PI / 2.0).to_degrees();
    Coordinate::new(lat, p.x)
}

/// Great-circle distance in meters
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = lat2 - lat1;
    let dlon = wrap_longitude_delta(b.lon() - a.lon()).to_radians();

    let s_lat = (dlat / 2.0).sin();
    let s_lon = (dlon / 2.0).sin();
    let h = s_lat * s_lat + lat1.cos() * lat2.cos() * s_lon * s_lon;

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial great-circle bearing from `from` towards `to`, degrees in [0, 360)
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat().to_radians();
    let lat2 = to.lat().to_radians();
    let dlon = wrap_longitude_delta(to.lon() - from.lon()).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Project `from` along a great circle with the given initial bearing
pub fn destination(from: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = from.lat().to_radians();
    let lon1 = from.lon().to_radians();

    let sin_lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    let lat = lat2.to_degrees().clamp(-90.0, 90.0);
    // Both components are finite and latitude is clamped, so construction cannot fail
    Coordinate::new(lat, lon2.to_degrees()).unwrap_or(from)
}

fn azimuth_in_plane(dx: f64, dy: f64, north_offset_deg: f64) -> f64 {
    normalize_degrees(dx.atan2(dy).to_degrees() - north_offset_deg)
}

/// Distance from `center` to `point` and the direction of `point` as seen from `center`.
///
/// The azimuth is measured in the Mercator plane, so swapping the two points
/// turns it by exactly half a circle.
pub fn distance_and_azimuth(
    point: Coordinate,
    center: Coordinate,
    north_offset_deg: f64,
) -> DistanceAndAzimuth {
    let dx = wrap_longitude_delta(point.lon() - center.lon());
    let dy = mercator_y(point.lat()) - mercator_y(center.lat());

    DistanceAndAzimuth {
        distance_m: haversine_distance(center, point),
        azimuth_deg: azimuth_in_plane(dx, dy, north_offset_deg),
    }
}

/// Same as [`distance_and_azimuth`] for a point already in Mercator space
pub fn distance_and_azimuth_from_mercator(
    point: MercatorPoint,
    center: Coordinate,
    north_offset_deg: f64,
) -> crate::error::Result<DistanceAndAzimuth> {
    let target = from_mercator(point)?;
    let c = to_mercator(center);

    Ok(DistanceAndAzimuth {
        distance_m: haversine_distance(center, target),
        azimuth_deg: azimuth_in_plane(
            wrap_longitude_delta(point.x - c.x),
            point.y - c.y,
            north_offset_deg,
        ),
    })
}
