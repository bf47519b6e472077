// src/region/countries.rs
//! Loader for the indentation-based country list
//!
//! ```text
//!  Europe
//!   France;4200000
//! 031
//! 120
//!    Corsica
//! 033
//! ```
//!
//! One to three leading spaces open a group, country or region node; an
//! optional `;size` gives the download size in bytes. Unindented lines are
//! quadkey cells owned by the most recently opened node.

use super::cell::CellId;
use super::index::{RegionId, RegionIndex};
use crate::error::{NavError, Result};
use std::path::Path;
use tracing::debug;

const MAX_DEPTH: usize = 3;

fn parse_node(line: &str, line_no: usize) -> Result<(&str, u64)> {
    match line.split_once(';') {
        Some((name, size)) => {
            let size = size.trim().parse::<u64>().map_err(|_| {
                NavError::Parse(format!("line {}: invalid size '{}'", line_no, size))
            })?;
            Ok((name.trim(), size))
        }
        None => Ok((line.trim(), 0)),
    }
}

/// Parse a country list into a fresh index at `level`
pub fn parse_countries(text: &str, level: u8) -> Result<RegionIndex> {
    let index = RegionIndex::new(level)?;
    // (name, id) of the open node at each depth
    let mut path: Vec<(String, RegionId)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        let spaces = line.len() - line.trim_start_matches(' ').len();
        match spaces {
            0 => {
                let (_, id) = path.last().ok_or_else(|| {
                    NavError::Parse(format!("line {}: cell before any country", line_no))
                })?;
                let cell = CellId::parse(line)
                    .map_err(|e| NavError::Parse(format!("line {}: {}", line_no, e)))?;
                if cell.level() != level {
                    return Err(NavError::Parse(format!(
                        "line {}: cell {} is not level {}",
                        line_no, cell, level
                    )));
                }
                index.assign_cell(*id, cell)?;
            }
            depth if depth <= MAX_DEPTH => {
                if depth > path.len() + 1 {
                    return Err(NavError::Parse(format!(
                        "line {}: node at depth {} has no parent",
                        line_no, depth
                    )));
                }
                path.truncate(depth - 1);

                let (name, size) = parse_node(line, line_no)?;
                let parent = path.last().map(|(n, _)| n.as_str());
                let id = index.add_region(name, parent, size);
                path.push((name.to_string(), id));
            }
            depth => {
                return Err(NavError::Parse(format!(
                    "line {}: indentation {} exceeds {}",
                    line_no, depth, MAX_DEPTH
                )));
            }
        }
    }

    if index.region_count() == 0 {
        return Err(NavError::Parse("country list has no entries".to_string()));
    }

    debug!(regions = index.region_count(), level, "country list loaded");
    Ok(index)
}

pub fn load_countries(path: &Path, level: u8) -> Result<RegionIndex> {
    let text = std::fs::read_to_string(path)?;
    parse_countries(&text, level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::region::RegionLookup;

    fn cell_at(lat: f64, lon: f64, level: u8) -> String {
        CellId::from_coordinate(Coordinate::new(lat, lon).unwrap(), level).to_string()
    }

    #[test]
    fn test_parse_tree() {
        let text = format!(
            " Europe\n  France;4200\n{}\n   Corsica;300\n{}\n  Spain\n{}\n",
            cell_at(48.8, 2.3, 6),
            cell_at(42.0, 9.0, 6),
            cell_at(40.4, -3.7, 6)
        );
        let index = parse_countries(&text, 6).unwrap();
        assert_eq!(index.region_count(), 4);

        let france = index.find_by_name("France").unwrap();
        let corsica = index.find_by_name("Corsica").unwrap();
        let spain = index.find_by_name("Spain").unwrap();

        assert_eq!(index.region(france).unwrap().parent.as_deref(), Some("Europe"));
        assert_eq!(index.region(corsica).unwrap().parent.as_deref(), Some("France"));
        assert_eq!(index.region(spain).unwrap().parent.as_deref(), Some("Europe"));
        assert_eq!(index.size(corsica), Some((0, 300)));

        let paris = Coordinate::new(48.8, 2.3).unwrap();
        assert_eq!(index.region_for(paris).unwrap(), RegionLookup::Region(france));
        let madrid = Coordinate::new(40.4, -3.7).unwrap();
        assert_eq!(index.region_for(madrid).unwrap(), RegionLookup::Region(spain));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_countries("", 4).is_err());
        assert!(parse_countries("0123\n", 4).is_err());
        assert!(parse_countries(" Europe\n   France\n", 4).is_err());
        assert!(parse_countries(" Europe\n    Deep\n", 4).is_err());
        assert!(parse_countries(" Europe\n  France\nxyz\n", 4).is_err());
        assert!(parse_countries(" Europe\n  France\n012\n", 4).is_err());
        assert!(parse_countries(" Europe\n  France;big\n", 4).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.txt");
        std::fs::write(&path, " World\n  Atlantis;10\n0000\n").unwrap();
        let index = load_countries(&path, 4).unwrap();
        assert_eq!(index.region_count(), 2);
        assert!(load_countries(&dir.path().join("missing.txt"), 4).is_err());
    }
}
