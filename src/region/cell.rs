// src/region/cell.rs v2
//! Quadtree cells over the Web Mercator tile grid

use crate::error::{NavError, Result};
use crate::geo::math::MAX_MERCATOR_LAT;
use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest cell level; tile coordinates must fit a `u32`
pub const MAX_CELL_LEVEL: u8 = 24;

/// Reject levels the tile grid cannot represent
pub fn check_level(level: u8) -> Result<()> {
    if level == 0 || level > MAX_CELL_LEVEL {
        return Err(NavError::InvalidInput(format!(
            "cell level must be in 1..={}, got {}",
            MAX_CELL_LEVEL, level
        )));
    }
    Ok(())
}

/// Calculate tile coordinates from lat/lon and zoom level
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
    let n = 2_f64.powi(zoom as i32);
    let max = (1u64 << zoom) - 1;
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor().max(0.0) as u64;
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor()
        .max(0.0) as u64;

    // lon = 180 and the southern clamp land exactly on the far edge
    (x.min(max) as u32, y.min(max) as u32)
}

/// A quadtree cell written as a quadkey: one digit 0-3 per level
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellId(String);

impl CellId {
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty()
            || s.len() > MAX_CELL_LEVEL as usize
            || !s.bytes().all(|b| (b'0'..=b'3').contains(&b))
        {
            return Err(NavError::Parse(format!("Invalid cell id: '{}'", s)));
        }
        Ok(Self(s.to_string()))
    }

    pub fn from_tile(x: u32, y: u32, level: u8) -> Self {
        let mut key = String::with_capacity(level as usize);
        for i in (1..=level).rev() {
            let mask = 1u32 << (i - 1);
            let mut digit = b'0';
            if x & mask != 0 {
                digit += 1;
            }
            if y & mask != 0 {
                digit += 2;
            }
            key.push(digit as char);
        }
        Self(key)
    }

    pub fn from_coordinate(c: Coordinate, level: u8) -> Self {
        let (x, y) = lat_lon_to_tile(c.lat(), c.lon(), level);
        Self::from_tile(x, y, level)
    }

    pub fn level(&self) -> u8 {
        self.0.len() as u8
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tile coordinates (x, y, zoom) of this cell
    pub fn to_tile(&self) -> (u32, u32, u8) {
        let (mut x, mut y) = (0u32, 0u32);
        for b in self.0.bytes() {
            let d = (b - b'0') as u32;
            x = (x << 1) | (d & 1);
            y = (y << 1) | (d >> 1);
        }
        (x, y, self.level())
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CellId {
    type Error = NavError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<CellId> for String {
    fn from(c: CellId) -> Self {
        c.0
    }
}

/// All cells at `level` overlapping the rectangle
pub fn cells_in_rect(south: f64, west: f64, north: f64, east: f64, level: u8) -> Vec<CellId> {
    let (x0, y0) = lat_lon_to_tile(north, west, level);
    let (x1, y1) = lat_lon_to_tile(south, east, level);

    let mut cells = Vec::new();
    for x in x0.min(x1)..=x0.max(x1) {
        for y in y0.min(y1)..=y0.max(y1) {
            cells.push(CellId::from_tile(x, y, level));
        }
    }
    cells
}
