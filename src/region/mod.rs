// src/region/mod.rs
//! Packaged-region lookup and data presence tracking

pub mod cell;
mod countries;
mod index;

pub use cell::{cells_in_rect, lat_lon_to_tile, CellId, MAX_CELL_LEVEL};
pub use countries::{load_countries, parse_countries};
pub use index::{IndexSnapshot, Region, RegionId, RegionIndex, RegionLookup, RegionStatus};
