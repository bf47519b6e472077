// src/geo/mod.rs
//! Geodesic math, coordinate types and formatting

pub mod coord;
pub mod format;
pub mod ge0;
pub mod math;

pub use coord::{Coordinate, Fix};
pub use format::{
    format_altitude, format_distance, format_lat_lon, format_lat_lon_to_arr, format_speed,
    parse_coordinate_component, parse_lat_lon,
};
pub use ge0::{decode_ge0_url, generate_ge0_url, http_ge0_url, Ge0Link};
pub use math::{
    destination, distance_and_azimuth, distance_and_azimuth_from_mercator, from_mercator,
    haversine_distance, initial_bearing, normalize_degrees, to_mercator, DistanceAndAzimuth,
    MercatorPoint, EARTH_RADIUS_M,
};
